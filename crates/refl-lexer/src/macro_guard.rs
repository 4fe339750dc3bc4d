//! Scoped macro-parsing suspension, guaranteed to release on every exit path.

use crate::Tokenizer;

/// Disables macro parsing for as long as it lives, restoring the previous flag on drop —
/// including when the caller bails out early with `?`. Mirrors a scope-guard destructor, not
/// a manual enable/disable pair that an early return could skip.
pub struct MacroParsingGuard<'t, 'src> {
    tokenizer: &'t mut Tokenizer<'src>,
    previous: bool,
}

impl<'t, 'src> MacroParsingGuard<'t, 'src> {
    pub(crate) fn new(tokenizer: &'t mut Tokenizer<'src>) -> Self {
        let previous = tokenizer.macros_enabled;
        tokenizer.set_macro_parsing(false);
        MacroParsingGuard { tokenizer, previous }
    }

    pub fn tokenizer(&mut self) -> &mut Tokenizer<'src> {
        self.tokenizer
    }
}

impl Drop for MacroParsingGuard<'_, '_> {
    fn drop(&mut self) {
        self.tokenizer.set_macro_parsing(self.previous);
    }
}
