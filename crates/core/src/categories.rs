//! Static API name to category table and category ordering.

use std::collections::BTreeSet;

use crate::config::GeneratorConfig;

/// Category assigned to event namespaces that are not in the table.
pub const EVENT_CATEGORY: &str = "AppEvents";

/// Category always sorted last.
pub const OTHER_CATEGORY: &str = "Other";

/// Known APIs per category. Keys are scanner API names.
pub const API_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Authentication",
        &["appLogin", "getIsTossLoginIntegratedService"],
    ),
    ("Payment", &["checkoutPayment"]),
    ("Location", &["getCurrentLocation", "startUpdateLocation"]),
    (
        "Permission",
        &["getPermission", "requestPermission", "openPermissionDialog"],
    ),
    (
        "SystemInfo",
        &[
            "getNetworkStatus",
            "getPlatformOS",
            "getTossAppVersion",
            "getOperationalEnvironment",
            "getSchemeUri",
            "getLocale",
            "getDeviceId",
        ],
    ),
    (
        "GameCenter",
        &[
            "getGameCenterGameProfile",
            "openGameCenterLeaderboard",
            "submitGameCenterLeaderBoardScore",
            "getUserKeyForGame",
            "grantPromotionRewardForGame",
        ],
    ),
    ("Clipboard", &["getClipboardText", "setClipboardText"]),
    (
        "Share",
        &["share", "getTossShareLink", "contactsViral", "fetchContacts"],
    ),
    ("Media", &["openCamera", "fetchAlbumPhotos", "saveBase64Data"]),
    (
        "Device",
        &[
            "generateHapticFeedback",
            "setDeviceOrientation",
            "setScreenAwakeMode",
            "setSecureScreen",
            "setIosSwipeGestureEnabled",
        ],
    ),
    ("Navigation", &["closeView", "openURL"]),
    ("Events", &["eventLog"]),
    ("Certificate", &["appsInTossSignTossCert"]),
    (
        "Visibility",
        &["onVisibilityChangedByTransparentServiceWeb"],
    ),
    (
        "IAP",
        &[
            "IAPCreateOneTimePurchaseOrder",
            "IAPGetProductItemList",
            "IAPGetPendingOrders",
            "IAPGetCompletedOrRefundedOrders",
            "IAPCompleteProductGrant",
        ],
    ),
    (
        "Storage",
        &[
            "StorageGetItem",
            "StorageSetItem",
            "StorageRemoveItem",
            "StorageClearItems",
        ],
    ),
    (
        "Advertising",
        &[
            "GoogleAdMobLoadAppsInTossAdMob",
            "GoogleAdMobShowAppsInTossAdMob",
            "GoogleAdMobLoadAdMobInterstitialAd",
            "GoogleAdMobShowAdMobInterstitialAd",
            "GoogleAdMobLoadAdMobRewardedAd",
            "GoogleAdMobShowAdMobRewardedAd",
            "TossAdsInitialize",
            "TossAdsAttach",
            "TossAdsDestroy",
            "TossAdsDestroyAll",
        ],
    ),
    ("SafeArea", &["SafeAreaInsetsGet", "SafeAreaInsetsSubscribe"]),
    (
        "Partner",
        &["partnerAddAccessoryButton", "partnerRemoveAccessoryButton"],
    ),
    (
        "AppEvents",
        &[
            "TdsEventSubscribeNavigationAccessoryEvent",
            "GraniteEventSubscribeBackEvent",
            "AppsInTossEventSubscribeEntryMessageExited",
        ],
    ),
    (
        "Environment",
        &["envGetDeploymentId", "isMinVersionSupported", "getAppsInTossGlobals"],
    ),
];

/// Display and file emission order.
pub const CATEGORY_ORDER: &[&str] = &[
    "Authentication",
    "Payment",
    "IAP",
    "SystemInfo",
    "Location",
    "Permission",
    "GameCenter",
    "Share",
    "Media",
    "Clipboard",
    "Device",
    "Navigation",
    "Events",
    "Certificate",
    "Visibility",
    "Storage",
    "Advertising",
    "SafeArea",
    "Partner",
    "AppEvents",
    "Environment",
    "Other",
];

/// Looks up the built-in table only.
pub fn table_category(api_name: &str) -> Option<&'static str> {
    API_CATEGORIES
        .iter()
        .find(|(_, apis)| apis.contains(&api_name))
        .map(|(category, _)| *category)
}

/// Resolves an API's category: config override, table, event default, then fallback.
pub fn resolve_category(
    api_name: &str,
    is_event_subscription: bool,
    config: &GeneratorConfig,
) -> Option<String> {
    if let Some(category) = config.categories.get(api_name) {
        return Some(category.clone());
    }
    if let Some(category) = table_category(api_name) {
        return Some(category.to_string());
    }
    if is_event_subscription {
        return Some(EVENT_CATEGORY.to_string());
    }
    config.fallback_category.clone()
}

/// Sorts categories: known order first, unknown alphabetically, `Other` last.
pub fn sort_categories<'a>(categories: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let unique: BTreeSet<&str> = categories.into_iter().collect();
    let mut known: Vec<&str> = Vec::new();
    let mut unknown: Vec<&str> = Vec::new();
    let mut has_other = false;
    for category in unique {
        if category == OTHER_CATEGORY {
            has_other = true;
        } else if CATEGORY_ORDER.contains(&category) {
            known.push(category);
        } else {
            unknown.push(category);
        }
    }
    known.sort_by_key(|c| CATEGORY_ORDER.iter().position(|o| o == c));
    let mut sorted: Vec<String> = known
        .into_iter()
        .chain(unknown)
        .map(str::to_string)
        .collect();
    if has_other {
        sorted.push(OTHER_CATEGORY.to_string());
    }
    sorted
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lookup() {
        assert_eq!(table_category("appLogin"), Some("Authentication"));
        assert_eq!(table_category("IAPGetPendingOrders"), Some("IAP"));
        assert_eq!(table_category("nope"), None);
    }

    #[test]
    fn test_resolution_order() {
        let mut config = GeneratorConfig::default();
        assert_eq!(resolve_category("nope", false, &config), None);
        assert_eq!(
            resolve_category("nope", true, &config).as_deref(),
            Some("AppEvents")
        );
        config.fallback_category = Some("Other".into());
        assert_eq!(resolve_category("nope", false, &config).as_deref(), Some("Other"));
        config.categories.insert("appLogin".into(), "Device".into());
        assert_eq!(
            resolve_category("appLogin", false, &config).as_deref(),
            Some("Device")
        );
    }

    #[test]
    fn test_sort_categories() {
        let sorted = sort_categories(["Other", "Zeta", "Device", "Alpha", "Authentication"]);
        assert_eq!(sorted, vec!["Authentication", "Device", "Alpha", "Zeta", "Other"]);
    }
}
