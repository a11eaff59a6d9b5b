mod command_input;
mod confirm_dialog;
mod entry_form;
mod input;
mod key_result;
mod search_input;
mod toast;

pub use command_input::{CommandEvent, CommandInput};
pub use confirm_dialog::{ConfirmDialog, ConfirmEvent};
pub use entry_form::{EntryForm, FormEvent};
pub use input::{InputEvent, TextInput};
pub use key_result::KeyResult;
pub use search_input::{SearchEvent, SearchInput};
pub use toast::Toasts;
