/// Sets or removes an environment variable for the lifetime of the guard,
/// restoring the previous value on drop. Tests using this must be marked
/// #[serial].
pub struct TemporaryEnv(&'static str, Option<String>);

impl TemporaryEnv {
    pub fn new(key: &'static str, value: impl AsRef<str>) -> Self {
        let old_value = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        Self(key, old_value)
    }

    pub fn unset(key: &'static str) -> Self {
        let old_value = std::env::var(key).ok();
        std::env::remove_var(key);
        Self(key, old_value)
    }
}

impl Drop for TemporaryEnv {
    fn drop(&mut self) {
        if let Some(value) = self.1.as_ref() {
            std::env::set_var(self.0, value);
        } else {
            std::env::remove_var(self.0);
        }
    }
}
