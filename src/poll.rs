/// calls `f` up to `attempts` times until it yields a value
///
/// `Ok(None)` means the bound was exhausted, errors from `f` end the loop
/// right away.
pub fn poll_until<T, E>(
    attempts: u32,
    mut f: impl FnMut() -> Result<Option<T>, E>,
) -> Result<Option<T>, E> {
    for _ in 0..attempts {
        if let Some(value) = f()? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}
