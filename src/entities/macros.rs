//! Macros for reducing boilerplate when defining entities

/// Define a closed set of string tags
///
/// Generates a `Copy` enum with `VALUES`, `as_str`, `Display`, `FromStr`
/// and string (de)serialization. Parsing a value outside the set fails with
/// [`ValidationError::InvalidEnumValue`](crate::core::error::ValidationError)
/// naming the value and the allowed set.
///
/// # Example
/// ```rust,ignore
/// string_enum!(
///     /// Supported themes
///     Theme {
///         Light => "light",
///         Dark => "dark",
///     }
/// );
///
/// assert_eq!("dark".parse::<Theme>()?, Theme::Dark);
/// assert!(Theme::VALUES.contains(&"light"));
/// ```
#[macro_export]
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $variant:ident => $tag:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $variant, )+
        }

        impl $name {
            /// Every accepted tag, in declaration order
            pub const VALUES: &'static [&'static str] = &[ $( $tag, )+ ];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $tag, )+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::core::error::ValidationError;

            fn from_str(value: &str) -> ::std::result::Result<Self, Self::Err> {
                match value {
                    $( $tag => Ok($name::$variant), )+
                    other => Err($crate::core::error::ValidationError::InvalidEnumValue {
                        field: stringify!($name).to_string(),
                        values: vec![other.to_string()],
                        allowed: Self::VALUES.iter().map(|v| v.to_string()).collect(),
                    }),
                }
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(
                &self,
                serializer: S,
            ) -> ::std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(
                deserializer: D,
            ) -> ::std::result::Result<Self, D::Error> {
                let value = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                value.parse().map_err(<D::Error as ::serde::de::Error>::custom)
            }
        }
    };
}
