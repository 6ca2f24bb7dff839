/// Machine readable category of a [`GraphqlError`](crate::GraphqlError), serialized as
/// `extensions.code`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    InternalServerError,
    // Field errors
    ArgumentCoercionError,
    ResolverError,
    ScalarSerializationError,
    UnknownRuntimeType,
    InvalidResolverValue,
    NonNullViolation,
}
