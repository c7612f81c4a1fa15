/// Category filter value selecting every registered provider
pub const ALL_CATEGORIES: &str = "all";

/// Providers in this category are queried with the request's city
pub const WEATHER_CATEGORY: &str = "weather";
