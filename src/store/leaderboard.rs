use vectorshop_schema::{LeaderboardEntry, LeaderboardSource, TemporaryLeaderboardRow, UserRow};

use crate::error::ProviderError;
use crate::supabase::SupabaseClient;

pub const TEMPORARY_TABLE: &str = "temporary_leaderboard";
pub const USERS_TABLE: &str = "users";

const TEMPORARY_COLUMNS: &str = "id,name,exp_points,display_id,class";
const USER_COLUMNS: &str = "id,full_name,exp,display_id,points";

/// Walk-in players first, then registered users, stably ordered by exp (highest first).
/// A missing exp ranks as 0 but is reported as null.
pub fn merge(temporary: Vec<TemporaryLeaderboardRow>, users: Vec<UserRow>) -> Vec<LeaderboardEntry> {
    let temporary = temporary.into_iter().map(|row| LeaderboardEntry {
        id: row.id,
        name: row.name,
        exp: row.exp_points,
        display_id: row.display_id,
        class: Some(row.class),
        points: None,
        source: LeaderboardSource::Temporary,
    });
    let registered = users.into_iter().map(|row| LeaderboardEntry {
        id: row.id,
        name: row.full_name,
        exp: row.exp,
        display_id: row.display_id,
        class: None,
        points: row.points,
        source: LeaderboardSource::User,
    });

    let mut entries: Vec<LeaderboardEntry> = temporary.chain(registered).collect();
    entries.sort_by_key(|entry| std::cmp::Reverse(entry.exp.unwrap_or(0)));
    entries
}

/// Reads both tables and merges them.
pub async fn load(client: &SupabaseClient) -> Result<Vec<LeaderboardEntry>, ProviderError> {
    let temporary = client
        .from(TEMPORARY_TABLE)
        .select(TEMPORARY_COLUMNS)
        .order("exp_points", false)
        .fetch::<TemporaryLeaderboardRow>()
        .await?;
    let users = client
        .from(USERS_TABLE)
        .select(USER_COLUMNS)
        .order("exp", false)
        .fetch::<UserRow>()
        .await?;
    Ok(merge(temporary, users))
}
