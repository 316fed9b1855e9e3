use serde::{Deserialize, Serialize};

/// One synthetic user as stored in both backends.
///
/// The numeric id is not a stored field: the tree backend keys children by
/// positional index and the relational backend assigns its own row ids.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub name: String,
    pub email: String,
    pub bio: String,
    pub skills: Vec<String>,
}

impl UserRecord {
    /// Display name for `id`: `User{id} Lastname{id}`.
    pub fn name_for(id: usize) -> String {
        let (first, last) = Self::name_parts(id);
        format!("{first} {last}")
    }

    /// Email for `id`: `first.last@example.com`, lowercased.
    pub fn email_for(id: usize) -> String {
        let (first, last) = Self::name_parts(id);
        format!(
            "{}.{}@example.com",
            first.to_lowercase(),
            last.to_lowercase()
        )
    }

    pub fn bio_for(id: usize) -> String {
        format!("I am user number {id} with a passion for technology and innovation.")
    }

    fn name_parts(id: usize) -> (String, String) {
        (format!("User{id}"), format!("Lastname{id}"))
    }
}
