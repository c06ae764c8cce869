use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let role = s.trim();
        if role.eq_ignore_ascii_case("student") {
            Ok(Role::Student)
        } else if role.eq_ignore_ascii_case("instructor") {
            Ok(Role::Instructor)
        } else if role.eq_ignore_ascii_case("admin") {
            Ok(Role::Admin)
        } else {
            Err(format!("unknown role '{}'", s))
        }
    }
}
