use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub project_manager: Option<Uuid>,
    pub outreach: Vec<Uuid>,
    pub designers: Vec<Uuid>,
    pub developers: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Whether the user manages or contributes to this project.
    /// Mirrors the membership predicate used by `service::projects::get_user_projects`.
    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.project_manager == Some(user_id)
            || self.outreach.contains(&user_id)
            || self.designers.contains(&user_id)
            || self.developers.contains(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        Project {
            id: Uuid::new_v4(),
            name: "Website".into(),
            description: None,
            project_manager: None,
            outreach: vec![],
            designers: vec![],
            developers: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn manager_is_member() {
        let user = Uuid::new_v4();
        let mut p = project();
        p.project_manager = Some(user);
        assert!(p.has_member(user));
    }

    #[test]
    fn each_contributor_list_counts() {
        let user = Uuid::new_v4();
        for field in 0..3 {
            let mut p = project();
            match field {
                0 => p.outreach.push(user),
                1 => p.designers.push(user),
                _ => p.developers.push(user),
            }
            assert!(p.has_member(user), "list {field} should grant membership");
        }
    }

    #[test]
    fn stranger_is_not_member() {
        let mut p = project();
        p.project_manager = Some(Uuid::new_v4());
        p.developers.push(Uuid::new_v4());
        assert!(!p.has_member(Uuid::new_v4()));
    }
}
