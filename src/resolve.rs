use crate::{
    foundation::error::{SplashError, SplashResult},
    script::{CommandToken, Environment, Value, ValueKind},
};

/// Materialize `token` as a value of `expected` kind.
///
/// Literals must already carry the expected kind; variables are looked up in `env` and
/// narrowed. Unbound names are always an error.
pub fn resolve(token: &CommandToken, env: &Environment, expected: ValueKind) -> SplashResult<Value> {
    let value = match token {
        CommandToken::Literal(v) => v,
        CommandToken::Variable(name) => env
            .get(name)
            .ok_or_else(|| SplashError::VariableNotFound(name.clone()))?,
    };
    if value.kind() != expected {
        return Err(SplashError::type_mismatch(
            expected,
            format!("expected {expected}, got {}", value.kind()),
        ));
    }
    Ok(value.clone())
}

/// Resolve an integer. `what` describes the argument in the mismatch message.
pub fn resolve_int(token: &CommandToken, env: &Environment, what: &str) -> SplashResult<i64> {
    match resolve(token, env, ValueKind::Int) {
        Ok(v) => v
            .as_int()
            .ok_or_else(|| SplashError::type_mismatch(ValueKind::Int, format!("expected {what}"))),
        Err(SplashError::TypeMismatch { .. }) => Err(SplashError::type_mismatch(
            ValueKind::Int,
            format!("expected {what}"),
        )),
        Err(e) => Err(e),
    }
}

/// Resolve a string. `what` describes the argument in the mismatch message.
pub fn resolve_str(token: &CommandToken, env: &Environment, what: &str) -> SplashResult<String> {
    match resolve(token, env, ValueKind::Str) {
        Ok(Value::Str(s)) => Ok(s),
        Ok(Value::Int(_)) | Err(SplashError::TypeMismatch { .. }) => Err(
            SplashError::type_mismatch(ValueKind::Str, format!("expected {what}")),
        ),
        Err(e) => Err(e),
    }
}
