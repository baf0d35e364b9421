pub mod bot_settings;
pub mod layout;
pub mod settings;
