//! Declarative helpers for string-valued S3 enumerations.

/// Define a string-valued S3 enumeration.
///
/// Generates the enum with serde renames for every wire value, `as_str`,
/// a `VALUES` table for validators, `Display`, and a fallible `FromStr`
/// that rejects unknown values with an `InvalidArgument` error.
macro_rules! s3_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                #[doc = concat!("`", $value, "`")]
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            /// All wire values, in declaration order.
            pub const VALUES: &'static [&'static str] = &[$($value),+];

            /// Returns the wire value of this variant.
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::S3Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok(Self::$variant),)+
                    other => Err($crate::error::S3Error::invalid_argument(format!(
                        "invalid {} value: {other:?}",
                        stringify!($name)
                    ))),
                }
            }
        }
    };
}
