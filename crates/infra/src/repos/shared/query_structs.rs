/// Selects the `ScheduledNotification`s a dispatcher may claim at `now_ts`
#[derive(Debug, Clone)]
pub struct DueNotificationsQuery {
    pub now_ts: i64,
    pub limit: usize,
    /// Notifications that failed this many times are abandoned and never due again
    pub max_tries: i64,
    /// Claims taken at or before this timestamp are stale and can be taken over
    pub stale_claim_before_ts: i64,
}
