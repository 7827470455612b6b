pub mod dataset;
pub mod debounce;
pub mod error;
pub mod model;
pub mod presenter;
pub mod search;
pub mod session;
pub mod story;
pub mod suggest;
pub mod tagger;
pub mod text;
