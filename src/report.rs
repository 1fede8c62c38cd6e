/// Receives user-facing progress messages.
pub trait Reporter {
    fn message(&mut self, msg: &str);
}

impl<F: FnMut(&str)> Reporter for F {
    fn message(&mut self, msg: &str) {
        self(msg)
    }
}
