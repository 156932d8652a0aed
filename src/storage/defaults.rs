use serde_json::{json, Value};

/// Well-known keys written by `initialize_defaults` when absent.
pub fn default_entries() -> Vec<(&'static str, Value)> {
    vec![
        ("users", json!([])),
        ("currentUser", Value::Null),
        ("userProfile", json!({})),
        ("userWebsites", json!([])),
        ("userCampaigns", json!([])),
        ("marketingCampaigns", json!([])),
        ("userBooks", json!([])),
        ("userTickets", json!([])),
        ("userAffiliates", json!([])),
        (
            "affiliateStats",
            json!({
                "totalAffiliates": 0,
                "activeAffiliates": 0,
                "totalCommission": 0,
                "affiliateSales": 0
            }),
        ),
        ("affiliateEarnings", json!([])),
        (
            "userStats",
            json!({
                "totalOrders": 0,
                "totalAffiliates": 0,
                "totalEarnings": 0,
                "pendingRequests": 0
            }),
        ),
        (
            "marketingStats",
            json!({
                "totalViews": 1250,
                "totalClicks": 89,
                "conversionRate": 7.1,
                "totalShares": 45
            }),
        ),
        ("recentActivities", json!([])),
        (
            "notificationSettings",
            json!({
                "emailOrders": true,
                "emailMarketing": true,
                "emailNews": false,
                "smsImportant": true,
                "smsPayments": true
            }),
        ),
    ]
}
