use crate::quote::QuoteEngine;

pub struct AppState {
    pub engine: QuoteEngine,
}
