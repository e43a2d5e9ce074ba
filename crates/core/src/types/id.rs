//! Newtype IDs for type-safe entity references.
//!
//! Every table in the back-office database uses a `SERIAL` primary key; the
//! `define_id!` macro wraps those in distinct types so a setting id can never
//! be passed where a chat session id is expected.

/// Define a type-safe `i32` ID wrapper.
///
/// The generated type is `Copy`, serializes transparently, converts to and
/// from `i32`, and (with the `postgres` feature) binds directly in `sqlx`
/// queries.
///
/// ```rust
/// # use proudshop_core::define_id;
/// define_id!(ProductId);
/// define_id!(OrderId);
///
/// let product = ProductId::new(7);
/// assert_eq!(product.as_i32(), 7);
/// // let _: OrderId = product; // does not compile
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Wrap a raw database id.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// The raw database id.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value).map(Self)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_id!(AdminUserId);
define_id!(SettingId);
define_id!(ChatSessionId);
define_id!(ChatMessageId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip_through_i32() {
        let id = SettingId::new(42);
        let raw: i32 = id.into();
        assert_eq!(raw, 42);
        assert_eq!(SettingId::from(raw), id);
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = ChatSessionId::new(9);
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "9");
        let parsed: ChatSessionId = serde_json::from_str("9").expect("deserialize");
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(AdminUserId::new(3).to_string(), "3");
    }
}
