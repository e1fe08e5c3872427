pub mod chromium;
pub mod connection;
pub mod driver;
pub mod headless;

pub use chromium::{ChromiumDriver, ChromiumDriverFactory};
pub use connection::connect_to_browser;
pub use driver::{BrowserDriver, DriverFactory, ElementHandle};
pub use headless::{launch_headless_browser, LaunchOptions};
