//! `define_port_error!` builds a `thiserror` enum plus one snake_case
//! constructor per variant, with `impl Into<T>` parameters for each field.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    define_port_error! {
        pub enum ProbePortError {
            Unavailable { message: String } => "store unavailable: {message}",
            Duplicate { field: String } => "duplicate {field}",
            Missing => "row missing",
            Limited { message: String, retries: u8 } => "{message} after {retries} attempts",
        }
    }

    #[test]
    fn string_fields_accept_str() {
        assert_eq!(
            ProbePortError::unavailable("pool closed").to_string(),
            "store unavailable: pool closed"
        );
    }

    #[test]
    fn unit_variants_get_nullary_constructors() {
        assert_eq!(ProbePortError::missing(), ProbePortError::Missing);
    }

    #[test]
    fn mixed_fields_keep_their_types() {
        let err = ProbePortError::limited("gave up", 3_u8);
        assert_eq!(err.to_string(), "gave up after 3 attempts");
        assert_eq!(
            ProbePortError::duplicate("slug"),
            ProbePortError::Duplicate {
                field: "slug".to_owned()
            }
        );
    }
}
