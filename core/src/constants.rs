//! Benchmark constants: dataset size, batch sizes and the skill catalog.

use std::num::NonZeroUsize;

/// Number of synthetic users the seeder generates.
pub const USER_COUNT: usize = 100_000;

/// Records per multi-path update against the tree backend.
pub const TREE_CHUNK_SIZE: usize = 10_000;
/// Rows per bulk insert against the relational backend.
pub const TABLE_CHUNK_SIZE: usize = 1_000;
/// Records requested per page by both scans.
pub const SCAN_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(size) => size,
    None => panic!("scan page size must be non-zero"),
};

/// Tree path holding the user children.
pub const USERS_PATH: &str = "users";
/// Relational table holding the user rows.
pub const USERS_TABLE: &str = "users";
/// Column projected by the scans and the warm-up query.
pub const NAME_COLUMN: &str = "name";

/// Inclusive bounds on the number of skills per user.
pub const MIN_SKILLS: usize = 3;
pub const MAX_SKILLS: usize = 8;

pub const SKILLS: [&str; 34] = [
    "HTML", "CSS", "JavaScript", "Python", "Java", "C++", "Ruby", "PHP", "Swift", "Kotlin",
    "React", "Angular", "Vue.js", "Node.js", "Express", "Django", "Flask", "Spring", "MongoDB",
    "PostgreSQL", "MySQL", "Redis", "Docker", "Kubernetes", "AWS", "Azure", "GCP", "Git",
    "CI/CD", "TensorFlow", "PyTorch", "Scikit-learn", "Pandas", "NumPy",
];
