//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up the variant for a database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Seed-data name of the status.
            pub fn label(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

define_status_enum! {
    /// Durable lifecycle status of an engagement.
    ///
    /// Legal transitions: DRAFT→PROCESSING, PROCESSING→COMPLETE,
    /// PROCESSING→ERROR, ERROR→PROCESSING.
    EngagementStatus {
        Draft = 1 => "DRAFT",
        Processing = 2 => "PROCESSING",
        Complete = 3 => "COMPLETE",
        Error = 4 => "ERROR",
    }
}

impl EngagementStatus {
    /// Statuses from which a new generation run may start.
    pub const LAUNCHABLE: [EngagementStatus; 2] =
        [EngagementStatus::Draft, EngagementStatus::Error];

    pub fn is_launchable(self) -> bool {
        Self::LAUNCHABLE.contains(&self)
    }

    /// Whether `self → next` is one of the documented transitions.
    pub fn can_transition_to(self, next: EngagementStatus) -> bool {
        use EngagementStatus::*;
        matches!(
            (self, next),
            (Draft, Processing) | (Processing, Complete) | (Processing, Error) | (Error, Processing)
        )
    }
}
