use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing an ID from a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

/// Declares a `u64`-backed identifier with `Debug` as `Name(n)`, plain `Display`,
/// and `FromStr`.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self::new)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                    })
            }
        }
    };
}

define_id!(
    /// Owner of subjects, exams and study sessions.
    UserId
);
define_id!(
    /// Unique identifier for a Subject
    SubjectId
);
define_id!(
    /// Identifier of a topic, unique within its subject's syllabus.
    TopicId
);
define_id!(
    /// Unique identifier for an Exam
    ExamId
);
define_id!(
    /// Unique identifier for a logged study session
    StudySessionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_id_display() {
        let id = SubjectId::new(42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn subject_id_debug_names_the_type() {
        assert_eq!(format!("{:?}", SubjectId::new(7)), "SubjectId(7)");
        assert_eq!(format!("{:?}", ExamId::new(3)), "ExamId(3)");
    }

    #[test]
    fn user_id_from_str_trims() {
        let id: UserId = " 123 ".parse().unwrap();
        assert_eq!(id, UserId::new(123));
    }

    #[test]
    fn exam_id_from_str_invalid() {
        let err = "not-a-number".parse::<ExamId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse ExamId from string");
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&SubjectId::new(9)).unwrap();
        assert_eq!(json, "9");
    }
}
