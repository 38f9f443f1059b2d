mod order_window;
mod pack_sort;

pub use order_window::{user_can_order, window_for_profile, OrderWindow, WindowConfigError};
pub use pack_sort::{pack_sort_key, PackKey, PackKeyInfo, DEFAULT_GROUP_KEY};
