use url::Url;

/// Identifiers describing the page a record was captured on.
///
/// Looked up once at initialization from the page URL's query string
/// (`gameId`, `roomId`, `userId`) and stamped onto every record.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub source_url: Option<String>,
    pub game_id: Option<String>,
    pub room_id: Option<String>,
    pub user_id: Option<String>,
}

impl PageContext {
    /// Extracts identifiers from a page URL. An unparseable URL still yields
    /// a usable context carrying the raw URL; extraction never fails.
    pub fn from_url(page_url: &str) -> Self {
        let mut context = Self {
            source_url: Some(page_url.to_string()),
            ..Self::default()
        };

        let Ok(url) = Url::parse(page_url) else {
            return context;
        };

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "gameId" => context.game_id = Some(value.into_owned()),
                "roomId" => context.room_id = Some(value.into_owned()),
                "userId" => context.user_id = Some(value.into_owned()),
                _ => {}
            }
        }
        context
    }

    /// Stamps the context onto a freshly built record.
    pub fn stamp(&self, mut record: crate::types::ErrorRecord) -> crate::types::ErrorRecord {
        record.source_url = self.source_url.clone();
        record.game_id = self.game_id.clone();
        record.room_id = self.room_id.clone();
        record.user_id = self.user_id.clone();
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorRecord, RecordKind};

    #[test]
    fn test_extracts_identifiers_from_query_string() {
        let context =
            PageContext::from_url("http://host/play?gameId=snake&roomId=r42&userId=u7&other=x");
        assert_eq!(context.game_id.as_deref(), Some("snake"));
        assert_eq!(context.room_id.as_deref(), Some("r42"));
        assert_eq!(context.user_id.as_deref(), Some("u7"));
        assert_eq!(
            context.source_url.as_deref(),
            Some("http://host/play?gameId=snake&roomId=r42&userId=u7&other=x")
        );
    }

    #[test]
    fn test_missing_identifiers_stay_absent() {
        let context = PageContext::from_url("http://host/play");
        assert!(context.game_id.is_none());
        assert!(context.room_id.is_none());
        assert!(context.user_id.is_none());
    }

    #[test]
    fn test_unparseable_url_keeps_raw_source() {
        let context = PageContext::from_url("not a url");
        assert_eq!(context.source_url.as_deref(), Some("not a url"));
        assert!(context.game_id.is_none());
    }

    #[test]
    fn test_stamp_fills_context_fields() {
        let context = PageContext::from_url("http://host/play?gameId=g1");
        let record = context.stamp(ErrorRecord::new(RecordKind::ConsoleError, "oops"));
        assert_eq!(record.game_id.as_deref(), Some("g1"));
        assert_eq!(record.source_url.as_deref(), Some("http://host/play?gameId=g1"));
        assert!(record.room_id.is_none());
    }
}
