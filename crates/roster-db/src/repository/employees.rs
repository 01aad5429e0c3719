//! Employee operations

use sqlx::Row;

use crate::error::DbError;
use crate::models::{Employee, NewEmployee};
use crate::repository::Database;

impl Database {
    /// Insert a new employee
    pub async fn insert_employee(&self, employee: NewEmployee) -> Result<Employee, DbError> {
        let result = sqlx::query("INSERT INTO employees (name, role) VALUES (?, ?) RETURNING id")
            .bind(&employee.name)
            .bind(&employee.role)
            .fetch_one(&self.pool)
            .await?;

        Ok(Employee {
            id: result.get("id"),
            name: employee.name,
            role: employee.role,
        })
    }

    /// Get an employee by ID
    pub async fn get_employee(&self, id: i64) -> Result<Option<Employee>, DbError> {
        let result = sqlx::query("SELECT id, name, role FROM employees WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| Employee::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// List all employees
    pub async fn list_employees(&self) -> Result<Vec<Employee>, DbError> {
        let rows = sqlx::query("SELECT id, name, role FROM employees ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| Employee::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Delete an employee
    pub async fn delete_employee(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_employee_lifecycle() {
        let db = Database::in_memory().await.unwrap();

        let created = db
            .insert_employee(NewEmployee {
                name: "John Doe".to_string(),
                role: "Developer".to_string(),
            })
            .await
            .unwrap();

        let listed = db.list_employees().await.unwrap();
        assert_eq!(listed, vec![created.clone()]);

        let fetched = db.get_employee(created.id).await.unwrap();
        assert_eq!(fetched, Some(created.clone()));

        assert!(db.delete_employee(created.id).await.unwrap());
        assert!(db.get_employee(created.id).await.unwrap().is_none());
        assert!(!db.delete_employee(created.id).await.unwrap());
    }
}
