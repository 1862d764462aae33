use super::models::AgentRow;
use super::SortOrder;
use crate::agents::Agent;
use crate::errors::StoreError;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

/// Repository for managing agent records in the SQLite database
pub struct AgentRepository<'a> {
    /// Database connection
    pub conn: &'a mut SqliteConnection,
}

impl<'a> AgentRepository<'a> {
    pub fn new(conn: &'a mut SqliteConnection) -> Self {
        AgentRepository { conn }
    }

    /// Lists every agent ordered by creation date
    pub fn list(&mut self, order: SortOrder) -> Result<Vec<Agent>, StoreError> {
        use crate::schema::agents::dsl::*;

        let rows = match order {
            SortOrder::NewestFirst => agents.order_by(created_date.desc()).load::<AgentRow>(self.conn)?,
            SortOrder::OldestFirst => agents.order_by(created_date.asc()).load::<AgentRow>(self.conn)?,
        };
        rows.into_iter().map(AgentRow::into_agent).collect()
    }

    /// Retrieves a single agent by id
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no agent has this id
    pub fn get(&mut self, agent_id: &str) -> Result<Agent, StoreError> {
        use crate::schema::agents::dsl::*;

        agents
            .filter(id.eq(agent_id))
            .first::<AgentRow>(self.conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound {
                kind: "Agent",
                id: agent_id.to_string(),
            })?
            .into_agent()
    }

    pub fn create(&mut self, agent: &Agent) -> Result<(), StoreError> {
        use crate::schema::agents;

        diesel::insert_into(agents::table)
            .values(&AgentRow::from_agent(agent)?)
            .execute(self.conn)?;
        Ok(())
    }

    /// Writes every field of `agent` over the stored record
    pub fn update(&mut self, agent: &Agent) -> Result<(), StoreError> {
        use crate::schema::agents;

        let row = AgentRow::from_agent(agent)?;
        let updated = diesel::update(agents::table.find(&agent.id))
            .set(&row)
            .execute(self.conn)?;
        if updated == 0 {
            return Err(StoreError::NotFound {
                kind: "Agent",
                id: agent.id.clone(),
            });
        }
        Ok(())
    }

    /// Deletes an agent; refused while tasks still reference it
    pub fn delete(&mut self, agent_id: &str) -> Result<(), StoreError> {
        use crate::schema::{agents, tasks};

        let assigned: i64 = tasks::table
            .filter(tasks::agent_id.eq(agent_id))
            .count()
            .get_result(self.conn)?;
        if assigned > 0 {
            return Err(StoreError::AgentInUse(agent_id.to_string()));
        }

        let deleted = diesel::delete(agents::table.find(agent_id)).execute(self.conn)?;
        if deleted == 0 {
            return Err(StoreError::NotFound {
                kind: "Agent",
                id: agent_id.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentDraft, AgentRole};
    use crate::core::{Task, TaskDraft};
    use crate::db::{Database, TaskRepository};
    use chrono::{Duration, Utc};

    fn agent(name: &str) -> Agent {
        Agent::new(AgentDraft {
            name: name.to_string(),
            role: AgentRole::Analyst,
            system_prompt: "Analyse things.".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            capabilities: vec!["statistics".to_string()],
            functions: vec!["plot".to_string()],
        })
    }

    #[test]
    fn create_then_get_returns_the_same_agent() {
        let db = Database::in_memory().unwrap();
        let mut conn = db.get_conn().unwrap();
        let mut repo = AgentRepository::new(&mut conn);

        let created = agent("Ana");
        repo.create(&created).unwrap();
        let loaded = repo.get(&created.id).unwrap();

        assert_eq!(loaded.name, "Ana");
        assert_eq!(loaded.role, AgentRole::Analyst);
        assert_eq!(loaded.capabilities, vec!["statistics"]);
        assert_eq!(loaded.functions, vec!["plot"]);
        assert_eq!(
            loaded.created_date.timestamp_micros(),
            created.created_date.timestamp_micros()
        );
    }

    #[test]
    fn list_sorts_by_creation_date() {
        let db = Database::in_memory().unwrap();
        let mut conn = db.get_conn().unwrap();
        let mut repo = AgentRepository::new(&mut conn);

        let mut older = agent("older");
        older.created_date = Utc::now() - Duration::hours(1);
        let newer = agent("newer");
        repo.create(&older).unwrap();
        repo.create(&newer).unwrap();

        let names: Vec<String> = repo
            .list(SortOrder::NewestFirst)
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["newer", "older"]);

        let oldest = repo.list(SortOrder::OldestFirst).unwrap();
        assert_eq!(oldest[0].name, "older");
    }

    #[test]
    fn update_and_delete() {
        let db = Database::in_memory().unwrap();
        let mut conn = db.get_conn().unwrap();
        let mut repo = AgentRepository::new(&mut conn);

        let mut a = agent("draft");
        repo.create(&a).unwrap();
        a.name = "final".to_string();
        a.functions.clear();
        repo.update(&a).unwrap();

        let loaded = repo.get(&a.id).unwrap();
        assert_eq!(loaded.name, "final");
        assert!(loaded.functions.is_empty());

        repo.delete(&a.id).unwrap();
        assert!(repo.get(&a.id).unwrap_err().is_not_found());
        assert!(repo.delete(&a.id).unwrap_err().is_not_found());
    }

    #[test]
    fn agent_with_tasks_cannot_be_deleted() {
        let db = Database::in_memory().unwrap();
        let mut conn = db.get_conn().unwrap();

        let a = agent("busy");
        AgentRepository::new(&mut conn).create(&a).unwrap();
        TaskRepository::new(&mut conn)
            .create(&Task::new(TaskDraft {
                title: "work".to_string(),
                description: String::new(),
                agent_id: a.id.clone(),
                parent_task_id: None,
                output_format: Default::default(),
            }))
            .unwrap();

        let err = AgentRepository::new(&mut conn).delete(&a.id).unwrap_err();
        assert!(matches!(err, StoreError::AgentInUse(_)));
    }
}
