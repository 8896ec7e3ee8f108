use crossterm::event::KeyEvent;

use crate::commands::CommandError;
use crate::provider::ProviderError;
use crate::types::Item;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Key(KeyEvent),
    Paste(String),
    Resize(u16, u16),
    Tick,
    Quit,
    ToggleView,
    ToggleSidebar,
    NavigateLeft,
    NavigateRight,
    SelectUp,
    SelectDown,
    SelectTop,
    SelectBottom,
    PageUp,
    PageDown,
    MoveColumnLeft,
    MoveColumnRight,
    StartSearch,
    CommitSearch,
    CancelSearch,
    ClearSearch,
    OpenSettings,
    CommitSettings,
    OpenEdit,
    CommitEdit,
    CloseOverlay,
    Complete,
    Refresh,
    RefreshFinished {
        token: u64,
        result: Result<Vec<Item>, ProviderError>,
    },
    MutationFinished {
        token: u64,
        result: Result<String, ProviderError>,
    },
    CategoriesListed {
        token: u64,
        result: Result<Vec<String>, ProviderError>,
    },
    CommandFinished {
        token: u64,
        result: Result<Option<String>, CommandError>,
    },
}
