//! Database entities.

pub mod site;
pub mod site_health_check;
pub mod user;
pub mod webhook_delivery;
pub mod webhook_endpoint;

pub use site::Entity as Site;
pub use site_health_check::Entity as SiteHealthCheck;
pub use user::Entity as User;
pub use webhook_delivery::Entity as WebhookDelivery;
pub use webhook_endpoint::Entity as WebhookEndpoint;
