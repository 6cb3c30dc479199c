use pretty_assertions::assert_eq;
use rentwatch_core::{
    compose_notification, scraping_error_notification, CommuteResult, HubWalk, ListingDetail,
    SCRAPING_ERROR_TITLE,
};

fn detail() -> ListingDetail {
    ListingDetail {
        title: " 2 bed flat to rent ".to_string(),
        url: "https://listings.example/properties/42".to_string(),
        rent_text: "£2,100 pcm".to_string(),
        description: "Bright flat near the park.".to_string(),
        image_url: "https://img.example/42.jpg".to_string(),
    }
}

#[test]
fn body_lists_rent_summary_commutes_and_hub() {
    let commutes = vec![
        CommuteResult::new("Office", 1530, 1250),
        CommuteResult::new("Gym", 600, 359),
    ];
    let hub = HubWalk {
        name: "Park Lane".to_string(),
        walking_minutes: 4,
    };

    let notification = compose_notification(&detail(), "\nQuiet street.", &commutes, Some(&hub));

    assert_eq!(notification.title, "2 bed flat to rent");
    assert_eq!(notification.url, "https://listings.example/properties/42");
    assert_eq!(
        notification.image_url.as_deref(),
        Some("https://img.example/42.jpg")
    );
    assert_eq!(
        notification.body,
        "**Rent: £2,100 pcm**\n\nQuiet street.\n\nOffice: 🚇 25m   🚴 20m\nGym: 🚇 10m   🚴 5m\n🚴 Hub (Park Lane): 4m"
    );
}

#[test]
fn empty_summary_leaves_no_summary_section() {
    let commutes = vec![CommuteResult::new("Office", 600, 600)];
    let notification = compose_notification(&detail(), "", &commutes, None);
    assert_eq!(notification.body, "**Rent: £2,100 pcm**\n\nOffice: 🚇 10m   🚴 10m");
}

#[test]
fn unknown_cycling_time_leaves_only_transit() {
    let commutes = vec![
        CommuteResult::transit_only("Office", 900),
        CommuteResult::new("Gym", 600, 300),
    ];
    let notification = compose_notification(&detail(), "", &commutes, None);
    assert_eq!(
        notification.body,
        "**Rent: £2,100 pcm**\n\nOffice: 🚇 15m\nGym: 🚇 10m   🚴 5m"
    );
}

#[test]
fn missing_image_is_omitted() {
    let mut detail = detail();
    detail.image_url.clear();
    let notification = compose_notification(&detail, "", &[], None);
    assert_eq!(notification.image_url, None);
}

#[test]
fn scraping_error_points_at_listing() {
    let url = "https://listings.example/properties/77";
    let notification = scraping_error_notification(url);
    assert_eq!(notification.title, SCRAPING_ERROR_TITLE);
    assert_eq!(notification.url, url);
    assert!(notification.body.contains(url));
    assert_eq!(notification.image_url, None);
}
