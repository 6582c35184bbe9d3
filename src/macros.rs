//! # Model declaration macro
//!
//! `model!` declares a struct and implements [`crate::Model`] for it. Field
//! attributes take the place of column annotations:
//!
//! - `#[pk]` marks the primary key (at most one field)
//! - `#[constraint = "unique not null"]` appends a column constraint
//!
//! Any other field attribute (doc comments, `#[allow(..)]`, ...) stays on
//! the generated struct. Column names are the lowercased field names; the
//! table name is the lowercased struct name.
//!
//! ```ignore
//! liteforge::model! {
//!     #[derive(Debug, Clone, Default, PartialEq)]
//!     pub struct Product {
//!         #[pk]
//!         pub id: i64,
//!         #[constraint = "unique not null"]
//!         pub sku: String,
//!         pub price: f64,
//!     }
//! }
//! ```

#[macro_export]
macro_rules! model {
    (@field $field:expr ;) => {
        $field
    };
    (@field $field:expr ; [pk] $($rest:tt)*) => {
        $crate::model!(@field $field.primary_key() ; $($rest)*)
    };
    (@field $field:expr ; [constraint = $constraint:literal] $($rest:tt)*) => {
        $crate::model!(@field $field.constraint($constraint) ; $($rest)*)
    };
    (@field $field:expr ; [$($other:tt)+] $($rest:tt)*) => {
        $crate::model!(@field $field ; $($rest)*)
    };

    // Each pending field is `([attrs..] [kept..] field)`; ORM markers are
    // dropped from attrs, everything else moves to kept.
    (@struct [$($head:tt)*] { $($done:tt)* }) => {
        $($head)* { $($done)* }
    };
    (@struct [$($head:tt)*] { $($done:tt)* }
        ([] [$($keep:tt)*] $($field:tt)*) $($rest:tt)*
    ) => {
        $crate::model! {
            @struct [$($head)*] { $($done)* $($keep)* $($field)*, } $($rest)*
        }
    };
    (@struct [$($head:tt)*] { $($done:tt)* }
        ([[pk] $($attr:tt)*] [$($keep:tt)*] $($field:tt)*) $($rest:tt)*
    ) => {
        $crate::model! {
            @struct [$($head)*] { $($done)* } ([$($attr)*] [$($keep)*] $($field)*) $($rest)*
        }
    };
    (@struct [$($head:tt)*] { $($done:tt)* }
        ([[constraint = $constraint:literal] $($attr:tt)*] [$($keep:tt)*] $($field:tt)*)
        $($rest:tt)*
    ) => {
        $crate::model! {
            @struct [$($head)*] { $($done)* } ([$($attr)*] [$($keep)*] $($field)*) $($rest)*
        }
    };
    (@struct [$($head:tt)*] { $($done:tt)* }
        ([[$($other:tt)+] $($attr:tt)*] [$($keep:tt)*] $($field:tt)*) $($rest:tt)*
    ) => {
        $crate::model! {
            @struct [$($head)*] { $($done)* }
            ([$($attr)*] [$($keep)* #[$($other)+]] $($field)*) $($rest)*
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$($fattr:tt)+])*
                $fvis:vis $fname:ident : $fty:ty
            ),* $(,)?
        }
    ) => {
        $crate::model! {
            @struct [$(#[$meta])* $vis struct $name] {}
            $( ([$([$($fattr)+])*] [] $fvis $fname : $fty) )*
        }

        impl $crate::Model for $name {
            fn fields() -> ::std::vec::Vec<$crate::Field> {
                ::std::vec![
                    $(
                        $crate::model!(
                            @field $crate::Field::new(
                                stringify!($fname),
                                <$fty as $crate::SqlField>::DATA_TYPE,
                            ) ;
                            $([$($fattr)+])*
                        )
                    ),*
                ]
            }

            fn values(&self) -> $crate::Result<::std::vec::Vec<$crate::Value>> {
                ::std::result::Result::Ok(::std::vec![
                    $(
                        $crate::ToValue::to_value(&self.$fname)
                            .map_err(|e| e.context(concat!("field ", stringify!($fname))))?
                    ),*
                ])
            }

            fn assign(&mut self, row: &mut $crate::RowReader) -> $crate::Result<()> {
                $( self.$fname = row.next()?; )*
                Ok(())
            }
        }
    };
}
