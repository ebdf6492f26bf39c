//! Helper macro generating port error enums with one constructor per variant.
//!
//! Each variant gets a snake-case constructor whose fields accept
//! `impl Into<T>`, so adapters can write `SnapshotRepositoryError::query("...")`.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            #[doc = "Construct the `" $variant "` variant."]
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
            #[doc = "Construct the `" $variant "` variant."]
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
    //! Regression coverage for generated constructors.
    define_port_error! {
        pub enum ProbeError {
            Closed => "channel closed",
            Refused { message: String } => "refused: {message}",
            Throttled { retry_after: u32 } => "throttled for {retry_after}s",
            Mixed { message: String, attempt: u32 } => "{message} (attempt {attempt})",
        }
    }

    #[test]
    fn unit_variants_get_nullary_constructors() {
        assert_eq!(ProbeError::closed().to_string(), "channel closed");
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        assert_eq!(ProbeError::refused("blocked").to_string(), "refused: blocked");
    }

    #[test]
    fn constructors_support_mixed_fields() {
        assert_eq!(ProbeError::throttled(30_u32).to_string(), "throttled for 30s");
        assert_eq!(
            ProbeError::mixed("send failed", 2_u32).to_string(),
            "send failed (attempt 2)"
        );
    }
}
