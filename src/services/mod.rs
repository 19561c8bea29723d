//! Adapters for the external capabilities the engine consumes

pub mod calendar;
pub mod market_data;
pub mod notify;
pub mod page;

pub use calendar::{CalendarSource, HolidayCalendar, HolidayCnCalendar};
pub use market_data::{Quote, QuoteSource, TencentQuoteSource};
pub use notify::{MessageChannel, TelegramChannel, WebhookChannel};
pub use page::{PageExtractor, PageText, RenderServiceExtractor};
