use super::models::{format_timestamp, TaskRow};
use super::SortOrder;
use crate::core::{Task, TaskStatus};
use crate::errors::StoreError;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

/// Repository for managing task records in the SQLite database
pub struct TaskRepository<'a> {
    /// Database connection
    pub conn: &'a mut SqliteConnection,
}

impl<'a> TaskRepository<'a> {
    /// Creates a new TaskRepository instance
    ///
    /// # Arguments
    ///
    /// * `conn` - Mutable reference to SQLite database connection
    pub fn new(conn: &'a mut SqliteConnection) -> Self {
        TaskRepository { conn }
    }

    /// Lists tasks ordered by creation date
    ///
    /// # Arguments
    ///
    /// * `order` - Sort direction on `created_date`
    /// * `filter_status` - Only keep tasks in this status when set
    ///
    /// # Errors
    ///
    /// Returns an Error if database operations fail
    pub fn list(
        &mut self,
        order: SortOrder,
        filter_status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, StoreError> {
        use crate::schema::tasks::dsl::*;

        let mut query = tasks.into_boxed();
        if let Some(wanted) = filter_status {
            query = query.filter(status.eq(wanted.as_str()));
        }
        query = match order {
            SortOrder::NewestFirst => query.order_by(created_date.desc()),
            SortOrder::OldestFirst => query.order_by(created_date.asc()),
        };

        query
            .load::<TaskRow>(self.conn)?
            .into_iter()
            .map(TaskRow::into_task)
            .collect()
    }

    /// Retrieves a single task by id
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no task has this id
    pub fn get(&mut self, task_id: &str) -> Result<Task, StoreError> {
        use crate::schema::tasks::dsl::*;

        tasks
            .filter(id.eq(task_id))
            .first::<TaskRow>(self.conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound {
                kind: "Task",
                id: task_id.to_string(),
            })?
            .into_task()
    }

    /// Tasks chained after `parent_id`
    pub fn children(&mut self, parent_id: &str) -> Result<Vec<Task>, StoreError> {
        use crate::schema::tasks::dsl::*;

        tasks
            .filter(parent_task_id.eq(parent_id))
            .order_by(created_date.asc())
            .load::<TaskRow>(self.conn)?
            .into_iter()
            .map(TaskRow::into_task)
            .collect()
    }

    pub fn create(&mut self, task: &Task) -> Result<(), StoreError> {
        use crate::schema::tasks;

        diesel::insert_into(tasks::table)
            .values(&TaskRow::from_task(task))
            .execute(self.conn)?;
        Ok(())
    }

    /// Updates only the status and result of a task
    pub fn update_status(
        &mut self,
        task_id: &str,
        new_status: TaskStatus,
        new_result: Option<&str>,
    ) -> Result<(), StoreError> {
        use crate::schema::tasks::dsl::{id, result, status, tasks, updated_date};
        let now = format_timestamp(&Utc::now());

        let updated = diesel::update(tasks.filter(id.eq(task_id)))
            .set((
                status.eq(new_status.as_str()),
                result.eq(new_result),
                updated_date.eq(&now),
            ))
            .execute(self.conn)?;
        if updated == 0 {
            return Err(StoreError::NotFound {
                kind: "Task",
                id: task_id.to_string(),
            });
        }
        Ok(())
    }

    /// Moves a task to `in_progress` and clears its result, unless it is
    /// already running
    ///
    /// The check and the write are a single statement, so concurrent callers
    /// cannot both start the same task.
    ///
    /// # Returns
    ///
    /// `true` if this call started the task, `false` if it was already
    /// `in_progress` or does not exist
    pub fn start(&mut self, task_id: &str) -> Result<bool, StoreError> {
        use crate::schema::tasks::dsl::{id, result, status, tasks, updated_date};
        let running = TaskStatus::InProgress.as_str();
        let now = format_timestamp(&Utc::now());

        let updated = diesel::update(tasks.filter(id.eq(task_id)).filter(status.ne(running)))
            .set((
                status.eq(running),
                result.eq(None::<String>),
                updated_date.eq(&now),
            ))
            .execute(self.conn)?;
        Ok(updated == 1)
    }

    /// Marks every `in_progress` task as failed with `message`
    ///
    /// Used to recover tasks whose run ended with the process.
    ///
    /// # Returns
    ///
    /// The number of tasks that were reset
    pub fn fail_running(&mut self, message: &str) -> Result<usize, StoreError> {
        use crate::schema::tasks::dsl::{result, status, tasks, updated_date};
        let now = format_timestamp(&Utc::now());

        let updated = diesel::update(tasks.filter(status.eq(TaskStatus::InProgress.as_str())))
            .set((
                status.eq(TaskStatus::Failed.as_str()),
                result.eq(message),
                updated_date.eq(&now),
            ))
            .execute(self.conn)?;
        Ok(updated)
    }

    /// Deletes a task and unlinks the tasks chained after it
    pub fn delete(&mut self, task_id: &str) -> Result<(), StoreError> {
        use crate::schema::tasks::dsl::*;

        self.conn.transaction::<_, StoreError, _>(|conn| {
            diesel::update(tasks.filter(parent_task_id.eq(task_id)))
                .set(parent_task_id.eq(None::<String>))
                .execute(conn)?;
            let deleted = diesel::delete(tasks.filter(id.eq(task_id))).execute(conn)?;
            if deleted == 0 {
                return Err(StoreError::NotFound {
                    kind: "Task",
                    id: task_id.to_string(),
                });
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OutputFormat, TaskDraft};
    use crate::db::Database;
    use chrono::Duration;

    fn task(title: &str, parent: Option<&str>) -> Task {
        Task::new(TaskDraft {
            title: title.to_string(),
            description: format!("{} description", title),
            agent_id: "agent-1".to_string(),
            parent_task_id: parent.map(str::to_string),
            output_format: OutputFormat::JsonObject,
        })
    }

    #[test]
    fn round_trips_all_fields() {
        let db = Database::in_memory().unwrap();
        let mut conn = db.get_conn().unwrap();
        let mut repo = TaskRepository::new(&mut conn);

        let mut t = task("extract", Some("parent-id"));
        t.status = TaskStatus::Failed;
        t.result = Some("Error: boom".to_string());
        repo.create(&t).unwrap();

        let loaded = repo.get(&t.id).unwrap();
        assert_eq!(loaded.title, "extract");
        assert_eq!(loaded.status, TaskStatus::Failed);
        assert_eq!(loaded.result.as_deref(), Some("Error: boom"));
        assert_eq!(loaded.parent_task_id.as_deref(), Some("parent-id"));
        assert_eq!(loaded.output_format, OutputFormat::JsonObject);
    }

    #[test]
    fn update_status_overwrites_result() {
        let db = Database::in_memory().unwrap();
        let mut conn = db.get_conn().unwrap();
        let mut repo = TaskRepository::new(&mut conn);

        let mut t = task("rerun", None);
        t.result = Some("old".to_string());
        repo.create(&t).unwrap();

        repo.update_status(&t.id, TaskStatus::Done, Some("new")).unwrap();
        let loaded = repo.get(&t.id).unwrap();
        assert_eq!(loaded.status, TaskStatus::Done);
        assert_eq!(loaded.result.as_deref(), Some("new"));
    }

    #[test]
    fn list_filters_and_sorts() {
        let db = Database::in_memory().unwrap();
        let mut conn = db.get_conn().unwrap();
        let mut repo = TaskRepository::new(&mut conn);

        let mut first = task("first", None);
        first.created_date = Utc::now() - Duration::minutes(5);
        let mut second = task("second", None);
        second.status = TaskStatus::Done;
        repo.create(&first).unwrap();
        repo.create(&second).unwrap();

        let all = repo.list(SortOrder::NewestFirst, None).unwrap();
        assert_eq!(all[0].title, "second");
        assert_eq!(all[1].title, "first");

        let done = repo.list(SortOrder::OldestFirst, Some(TaskStatus::Done)).unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].title, "second");
    }

    #[test]
    fn start_succeeds_once_per_run() {
        let db = Database::in_memory().unwrap();
        let mut conn = db.get_conn().unwrap();
        let mut repo = TaskRepository::new(&mut conn);

        let mut t = task("start", None);
        t.status = TaskStatus::Done;
        t.result = Some("previous".to_string());
        repo.create(&t).unwrap();

        assert!(repo.start(&t.id).unwrap());
        let loaded = repo.get(&t.id).unwrap();
        assert_eq!(loaded.status, TaskStatus::InProgress);
        assert!(loaded.result.is_none());

        assert!(!repo.start(&t.id).unwrap());
        assert!(!repo.start("nope").unwrap());

        repo.update_status(&t.id, TaskStatus::Failed, Some("Error: x")).unwrap();
        assert!(repo.start(&t.id).unwrap());
    }

    #[test]
    fn running_tasks_can_be_failed_in_bulk() {
        let db = Database::in_memory().unwrap();
        let mut conn = db.get_conn().unwrap();
        let mut repo = TaskRepository::new(&mut conn);

        let mut stuck = task("stuck", None);
        stuck.status = TaskStatus::InProgress;
        let mut finished = task("finished", None);
        finished.status = TaskStatus::Done;
        finished.result = Some("kept".to_string());
        repo.create(&stuck).unwrap();
        repo.create(&finished).unwrap();

        assert_eq!(repo.fail_running("Error: interrupted").unwrap(), 1);
        let loaded = repo.get(&stuck.id).unwrap();
        assert_eq!(loaded.status, TaskStatus::Failed);
        assert_eq!(loaded.result.as_deref(), Some("Error: interrupted"));
        assert_eq!(repo.get(&finished.id).unwrap().result.as_deref(), Some("kept"));
        assert_eq!(repo.fail_running("Error: interrupted").unwrap(), 0);
    }

    #[test]
    fn deleting_a_parent_unlinks_children() {
        let db = Database::in_memory().unwrap();
        let mut conn = db.get_conn().unwrap();
        let mut repo = TaskRepository::new(&mut conn);

        let parent = task("parent", None);
        let child = task("child", Some(&parent.id));
        repo.create(&parent).unwrap();
        repo.create(&child).unwrap();
        assert_eq!(repo.children(&parent.id).unwrap().len(), 1);

        repo.delete(&parent.id).unwrap();
        assert!(repo.get(&parent.id).unwrap_err().is_not_found());
        assert!(repo.get(&child.id).unwrap().parent_task_id.is_none());
    }

    #[test]
    fn missing_task_is_reported() {
        let db = Database::in_memory().unwrap();
        let mut conn = db.get_conn().unwrap();
        let mut repo = TaskRepository::new(&mut conn);

        assert!(repo.get("nope").unwrap_err().is_not_found());
        assert!(repo
            .update_status("nope", TaskStatus::Done, None)
            .unwrap_err()
            .is_not_found());
    }
}
