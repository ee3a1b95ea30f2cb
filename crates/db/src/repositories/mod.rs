//! Repositories wrapping entity queries.

mod site;
mod site_health_check;
mod user;
mod webhook_delivery;
mod webhook_endpoint;

pub use site::SiteRepository;
pub use site_health_check::SiteHealthCheckRepository;
pub use user::UserRepository;
pub use webhook_delivery::WebhookDeliveryRepository;
pub use webhook_endpoint::{MAX_ENDPOINTS_PER_USER, WebhookEndpointRepository};
