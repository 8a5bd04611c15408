//! Exp and points bookkeeping done from the admin panel.

use vectorshop_schema::RowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Add,
    Reduce,
}

impl Adjustment {
    /// New balance; a missing balance counts as 0 and reductions stop at 0.
    pub fn apply(self, current: Option<i64>, amount: i64) -> i64 {
        let current = current.unwrap_or(0);
        match self {
            Adjustment::Add => current.saturating_add(amount),
            Adjustment::Reduce => current.saturating_sub(amount).max(0),
        }
    }

    pub fn exp_message(self, target: &ExpTarget) -> &'static str {
        match (self, target) {
            (Adjustment::Add, ExpTarget::Registered(_)) => "EXP added successfully to registered user",
            (Adjustment::Add, ExpTarget::Temporary(_)) => "EXP added successfully to temporary user",
            (Adjustment::Reduce, ExpTarget::Registered(_)) => {
                "EXP reduced successfully for registered user"
            }
            (Adjustment::Reduce, ExpTarget::Temporary(_)) => {
                "EXP reduced successfully for temporary user"
            }
        }
    }

    pub fn points_message(self) -> &'static str {
        match self {
            Adjustment::Add => "Points added successfully",
            Adjustment::Reduce => "Points reduced successfully",
        }
    }
}

/// Amount sent by the admin panel; absent, zero and negative values are refused.
pub fn valid_amount(amount: Option<i64>) -> Option<i64> {
    amount.filter(|a| *a > 0)
}

/// Whose exp is being changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpTarget {
    /// `users.exp`, keyed by account id.
    Registered(String),
    /// `temporary_leaderboard.exp_points`, keyed by `display_id`.
    Temporary(RowId),
}

impl ExpTarget {
    /// An account id wins over a display id. Empty values count as absent.
    pub fn resolve(user_id: Option<String>, display_id: Option<RowId>) -> Option<Self> {
        if let Some(id) = user_id.filter(|id| !id.is_empty()) {
            return Some(ExpTarget::Registered(id));
        }
        display_id
            .filter(|id| !matches!(id, RowId::Text(s) if s.is_empty()) && *id != RowId::Number(0))
            .map(ExpTarget::Temporary)
    }

    pub fn table(&self) -> &'static str {
        match self {
            ExpTarget::Registered(_) => "users",
            ExpTarget::Temporary(_) => "temporary_leaderboard",
        }
    }

    pub fn key_column(&self) -> &'static str {
        match self {
            ExpTarget::Registered(_) => "id",
            ExpTarget::Temporary(_) => "display_id",
        }
    }

    pub fn exp_column(&self) -> &'static str {
        match self {
            ExpTarget::Registered(_) => "exp",
            ExpTarget::Temporary(_) => "exp_points",
        }
    }

    pub fn key(&self) -> String {
        match self {
            ExpTarget::Registered(id) => id.clone(),
            ExpTarget::Temporary(id) => id.to_string(),
        }
    }

    pub fn not_found_message(&self) -> &'static str {
        match self {
            ExpTarget::Registered(_) => "Registered user not found",
            ExpTarget::Temporary(_) => "Temporary user not found",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_treats_missing_balance_as_zero() {
        assert_eq!(Adjustment::Add.apply(None, 15), 15);
        assert_eq!(Adjustment::Add.apply(Some(10), 15), 25);
    }

    #[test]
    fn reduce_never_goes_negative() {
        assert_eq!(Adjustment::Reduce.apply(Some(30), 10), 20);
        assert_eq!(Adjustment::Reduce.apply(Some(5), 10), 0);
        assert_eq!(Adjustment::Reduce.apply(None, 1), 0);
    }

    #[test]
    fn only_positive_amounts_are_accepted() {
        assert_eq!(valid_amount(Some(3)), Some(3));
        assert_eq!(valid_amount(Some(0)), None);
        assert_eq!(valid_amount(Some(-4)), None);
        assert_eq!(valid_amount(None), None);
    }

    #[test]
    fn account_id_takes_precedence_over_display_id() {
        let target = ExpTarget::resolve(Some("u1".to_string()), Some(RowId::from("T-1")));
        assert_eq!(target, Some(ExpTarget::Registered("u1".to_string())));

        let target = ExpTarget::resolve(Some(String::new()), Some(RowId::from("T-1")));
        assert_eq!(target, Some(ExpTarget::Temporary(RowId::from("T-1"))));
        assert_eq!(target.as_ref().map(ExpTarget::exp_column), Some("exp_points"));

        assert_eq!(ExpTarget::resolve(None, Some(RowId::from(""))), None);
        assert_eq!(ExpTarget::resolve(None, None), None);
    }

    #[test]
    fn messages_name_the_kind_of_player() {
        let walk_in = ExpTarget::Temporary(RowId::Number(4));
        assert_eq!(
            Adjustment::Reduce.exp_message(&walk_in),
            "EXP reduced successfully for temporary user"
        );
        assert_eq!(Adjustment::Add.points_message(), "Points added successfully");
    }
}
