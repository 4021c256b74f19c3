/// Define a profile parameter struct generic over its parameter representation
///
/// Generates the struct itself plus the static parameter-name table and the
/// ordered traversal/mapping methods the model mapper relies on. Parameter
/// order is the declaration order and is part of the model-vector contract.
macro_rules! profile_parameters {
    (
        $(#[$meta:meta])*
        $name:ident { $($param:ident),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, serde::Serialize, serde::Deserialize, schemars::JsonSchema, PartialEq)]
        pub struct $name<P> {
            $(pub $param: P,)+
        }

        impl<P> $name<P> {
            pub const PARAMETER_NAMES: &'static [&'static str] = &[$(stringify!($param)),+];

            pub fn parameters(&self) -> Vec<&P> {
                vec![$(&self.$param),+]
            }

            /// Rebuild the profile with every parameter replaced by `f(name, parameter)`
            pub fn map_named<Q>(&self, mut f: impl FnMut(&'static str, &P) -> Q) -> $name<Q> {
                $name {
                    $($param: f(stringify!($param), &self.$param),)+
                }
            }
        }
    };
}
