use serde::Serialize;

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct CreatedUserWebOutput {
    pub id: i32,
}
