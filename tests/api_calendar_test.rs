//! Integration tests for the calendar API endpoints

mod test_utils;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    use booker::calendar::{BusyInterval, CalendarEvent};

    use crate::test_utils::{FakeCalendar, UNREACHABLE_URL, body_json, test_app, utc};

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    /// Tests availability returns busy intervals and working-hour gaps
    #[tokio::test]
    async fn it_returns_busy_and_free_slots() {
        // 10:00-11:00 IST on a Monday well in the future
        let calendar = Arc::new(FakeCalendar::with_busy(vec![BusyInterval {
            start: utc("2030-01-07T04:30:00Z"),
            end: utc("2030-01-07T05:30:00Z"),
        }]));
        let app = test_app(UNREACHABLE_URL, calendar.clone());

        let response = app
            .oneshot(get(
                "/api/calendar/availability?start=2030-01-07T00:00:00&end=2030-01-07T23:59:00",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["timezone"], "Asia/Kolkata");
        assert_eq!(body["busy"].as_array().unwrap().len(), 1);

        let free = body["free"].as_array().unwrap();
        assert_eq!(free.len(), 2);
        assert_eq!(free[0]["start"], "2030-01-07T03:30:00Z");
        assert_eq!(free[0]["end"], "2030-01-07T04:30:00Z");
        assert_eq!(free[1]["start"], "2030-01-07T05:30:00Z");
        assert_eq!(free[1]["end"], "2030-01-07T12:30:00Z");

        assert_eq!(calendar.busy_queries().len(), 1);
    }

    /// Tests an inverted range is rejected before the calendar is queried
    #[tokio::test]
    async fn it_returns_400_for_inverted_range() {
        let calendar = Arc::new(FakeCalendar::default());
        let app = test_app(UNREACHABLE_URL, calendar.clone());

        let response = app
            .oneshot(get(
                "/api/calendar/availability?start=2030-01-07T18:00:00&end=2030-01-07T09:00:00",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_range");
        assert!(calendar.busy_queries().is_empty());
    }

    /// Tests windows longer than a month are rejected before the
    /// calendar is queried
    #[tokio::test]
    async fn it_returns_400_for_oversized_window() {
        let calendar = Arc::new(FakeCalendar::default());
        let app = test_app(UNREACHABLE_URL, calendar.clone());

        let response = app
            .oneshot(get(
                "/api/calendar/availability?start=2030-01-01T00:00:00&end=2999-12-31T00:00:00",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_input");
        assert!(calendar.busy_queries().is_empty());
    }

    /// Tests an unparseable datetime is a 400
    #[tokio::test]
    async fn it_returns_400_for_bad_datetime() {
        let app = test_app(UNREACHABLE_URL, Arc::new(FakeCalendar::default()));

        let response = app
            .oneshot(get(
                "/api/calendar/availability?start=tomorrow&end=2030-01-07T09:00:00",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_input");
    }

    /// Tests missing query params are rejected
    #[tokio::test]
    async fn it_returns_400_for_missing_params() {
        let app = test_app(UNREACHABLE_URL, Arc::new(FakeCalendar::default()));

        let response = app
            .oneshot(get("/api/calendar/availability"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    /// Tests calendar failures surface as 503
    #[tokio::test]
    async fn it_returns_503_when_calendar_is_unavailable() {
        let app = test_app(UNREACHABLE_URL, Arc::new(FakeCalendar::unavailable()));

        let response = app
            .oneshot(get(
                "/api/calendar/availability?start=2030-01-07T00:00:00&end=2030-01-07T23:59:00",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["error"], "calendar_unavailable");
    }

    /// Tests upcoming events are listed
    #[tokio::test]
    async fn it_lists_upcoming_events() {
        let calendar = Arc::new(FakeCalendar::with_events(vec![CalendarEvent {
            id: String::from("evt_1"),
            summary: String::from("Standup"),
            start: utc("2030-01-07T04:30:00Z"),
            end: utc("2030-01-07T04:45:00Z"),
            all_day: false,
            attendees: vec![String::from("alice@example.com")],
        }]));
        let app = test_app(UNREACHABLE_URL, calendar);

        let response = app
            .oneshot(get("/api/calendar/events?days_ahead=3"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let events = body["events"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["summary"], "Standup");
        assert_eq!(events[0]["attendees"][0], "alice@example.com");
    }

    /// Tests days_ahead must be in range
    #[tokio::test]
    async fn it_returns_400_for_bad_days_ahead() {
        let app = test_app(UNREACHABLE_URL, Arc::new(FakeCalendar::default()));

        let response = app
            .oneshot(get("/api/calendar/events?days_ahead=0"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
