//! Newtype IDs for type-safe entity references.
//!
//! Every table hands out `i32` identifiers. Wrapping them keeps a `CartId`
//! from being passed where a `ProductId` is expected.

/// Define a type-safe ID wrapper around `i32`.
///
/// The generated type is `Copy`, orders by its numeric value, serializes as
/// a bare number and (with the `postgres` feature) maps to `INTEGER`.
///
/// # Example
///
/// ```rust
/// # use bramble_core::define_id;
/// define_id!(WidgetId);
/// define_id!(GadgetId);
///
/// let widget = WidgetId::new(1);
/// assert_eq!(widget.as_i32(), 1);
///
/// // Different types, so this won't compile:
/// // let _: GadgetId = widget;
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
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type))]
        #[cfg_attr(feature = "postgres", sqlx(transparent))]
        pub struct $name(i32);

        impl $name {
            /// Wrap a raw identifier.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// The raw identifier.
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
    };
}

define_id!(UserId);
define_id!(ProductId);
define_id!(CartId);
define_id!(CartItemId);
define_id!(OrderId);
define_id!(OrderItemId);
