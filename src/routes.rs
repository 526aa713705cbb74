// Route path constants - single source of truth for all API paths.
// These double as the API Gateway resource patterns carried in operation descriptors.

pub const HEALTH: &str = "/health";
pub const USERS: &str = "/users";
pub const USER: &str = "/user";
pub const USER_ITEM: &str = "/user/{user_id}";
