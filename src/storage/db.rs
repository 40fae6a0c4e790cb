use rusqlite::{params, Connection, OptionalExtension, Row};
use crate::{
    error::{EcoShareError, Result},
    storage::models::{Comment, Donation, DonationStatus, Post, ReceiptSubmission, SubmissionRecord, User},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const DONATION_COLUMNS: &str = "id, donor_id, full_name, contact_number, food_type, item_name, weight,
     cooking_date, expiry_date, storage_instructions, pickup_address, image_ref,
     status, claimant_id, created_at";

const POST_COLUMNS: &str = "p.id, p.author_id, u.name, p.title, p.content, p.image_ref, p.created_at";

const COMMENT_COLUMNS: &str = "c.id, c.post_id, c.author_id, u.name, c.text, c.created_at";

/// SQLite-backed store shared by every component.
///
/// The connection sits behind a mutex so one `Database` can be shared through
/// an `Arc`. The lock is held for a single statement or transaction; claim
/// races are decided by conditional updates, never by holding the lock
/// across a read and a write.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self { conn: Mutex::new(conn) };
        db.init_schema()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| EcoShareError::InvariantViolation("database connection lock poisoned".to_string()))
    }

    fn init_schema(&self) -> Result<()> {
        self.conn()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                token TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS user_scores (
                user_id TEXT PRIMARY KEY REFERENCES users(id),
                green_score INTEGER NOT NULL DEFAULT 0 CHECK (green_score >= 0)
            );

            CREATE TABLE IF NOT EXISTS donations (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                donor_id TEXT NOT NULL REFERENCES users(id),
                full_name TEXT NOT NULL,
                contact_number TEXT NOT NULL,
                food_type TEXT NOT NULL,
                item_name TEXT NOT NULL,
                weight REAL,
                cooking_date TEXT NOT NULL,
                expiry_date TEXT NOT NULL,
                storage_instructions TEXT NOT NULL,
                pickup_address TEXT NOT NULL,
                image_ref TEXT,
                status TEXT NOT NULL,
                claimant_id TEXT,
                created_at TEXT NOT NULL,
                CHECK (expiry_date > cooking_date),
                CHECK (claimant_id IS NULL OR claimant_id <> donor_id),
                CHECK ((status = 'Claimed') = (claimant_id IS NOT NULL))
            );

            CREATE TABLE IF NOT EXISTS receipt_submissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL REFERENCES users(id),
                bill_type TEXT NOT NULL,
                bill_number TEXT NOT NULL,
                item_purchased TEXT NOT NULL,
                purchase_date TEXT,
                vendor TEXT NOT NULL,
                purchase_mode TEXT NOT NULL,
                eco_certification TEXT NOT NULL,
                total_amount REAL,
                extracted_fields TEXT NOT NULL,
                score_delta INTEGER NOT NULL,
                submitted_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS posts (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                author_id TEXT NOT NULL REFERENCES users(id),
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                image_ref TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS comments (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                author_id TEXT NOT NULL REFERENCES users(id),
                text TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_donation_status ON donations(status);
            CREATE INDEX IF NOT EXISTS idx_comment_post ON comments(post_id);
            CREATE INDEX IF NOT EXISTS idx_submission_user ON receipt_submissions(user_id);",
        )?;

        Ok(())
    }

    // ----- users -----

    /// Creates the user and their zeroed score row in one transaction.
    pub fn insert_user(&self, user: &User, token: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO users (id, name, token, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user.id, user.name, token, user.created_at],
        )?;
        tx.execute(
            "INSERT INTO user_scores (user_id, green_score) VALUES (?1, 0)",
            [&user.id],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, name, created_at FROM users WHERE id = ?1",
                [id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn find_user_by_token(&self, token: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, name, created_at FROM users WHERE token = ?1",
                [token],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    // ----- donations -----

    pub fn insert_donation(&self, donation: &Donation) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO donations
             (id, donor_id, full_name, contact_number, food_type, item_name, weight,
              cooking_date, expiry_date, storage_instructions, pickup_address, image_ref,
              status, claimant_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                donation.id,
                donation.donor_id,
                donation.full_name,
                donation.contact_number,
                donation.food_type,
                donation.item_name,
                donation.weight,
                donation.cooking_date,
                donation.expiry_date,
                donation.storage_instructions,
                donation.pickup_address,
                donation.image_ref,
                donation.status,
                donation.claimant_id,
                donation.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_donation(&self, id: &str) -> Result<Option<Donation>> {
        let conn = self.conn()?;
        let donation = conn
            .query_row(
                &format!("SELECT {} FROM donations WHERE id = ?1", DONATION_COLUMNS),
                [id],
                donation_from_row,
            )
            .optional()?;

        donation.map(checked).transpose()
    }

    /// Donations in the given status, in insertion order.
    pub fn get_donations_by_status(&self, status: DonationStatus) -> Result<Vec<Donation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM donations WHERE status = ?1 ORDER BY seq",
            DONATION_COLUMNS
        ))?;

        let donations = stmt
            .query_map([status], donation_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        donations.into_iter().map(checked).collect()
    }

    pub fn get_donations_by_donor(&self, donor_id: &str) -> Result<Vec<Donation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM donations WHERE donor_id = ?1 ORDER BY seq",
            DONATION_COLUMNS
        ))?;

        let donations = stmt
            .query_map([donor_id], donation_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        donations.into_iter().map(checked).collect()
    }

    /// Compare-and-set on a donation's status. The write only happens if the
    /// row is still in `expected`; returns whether it did.
    pub fn transition_status(
        &self,
        id: &str,
        expected: DonationStatus,
        next: DonationStatus,
        claimant_id: Option<&str>,
    ) -> Result<bool> {
        let changed = self.conn()?.execute(
            "UPDATE donations
             SET status = ?1, claimant_id = ?2
             WHERE id = ?3 AND status = ?4",
            params![next, claimant_id, id, expected],
        )?;

        Ok(changed == 1)
    }

    // ----- blog -----

    pub fn insert_post(&self, post: &Post) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO posts (id, author_id, title, content, image_ref, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                post.id,
                post.author_id,
                post.title,
                post.content,
                post.image_ref,
                post.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_post(&self, id: &str) -> Result<Option<Post>> {
        let conn = self.conn()?;
        let post = conn
            .query_row(
                &format!(
                    "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id WHERE p.id = ?1",
                    POST_COLUMNS
                ),
                [id],
                post_from_row,
            )
            .optional()?;
        Ok(post)
    }

    /// Newest posts first.
    pub fn get_posts(&self) -> Result<Vec<Post>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id ORDER BY p.seq DESC",
            POST_COLUMNS
        ))?;

        let posts = stmt
            .query_map([], post_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    /// Deletes the post and its comments only if `author_id` wrote it.
    /// Returns whether a row went away.
    pub fn delete_post(&self, id: &str, author_id: &str) -> Result<bool> {
        let changed = self.conn()?.execute(
            "DELETE FROM posts WHERE id = ?1 AND author_id = ?2",
            params![id, author_id],
        )?;
        Ok(changed == 1)
    }

    pub fn insert_comment(&self, comment: &Comment) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO comments (id, post_id, author_id, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comment.id,
                comment.post_id,
                comment.author_id,
                comment.text,
                comment.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<Comment>> {
        let conn = self.conn()?;
        let comment = conn
            .query_row(
                &format!(
                    "SELECT {} FROM comments c JOIN users u ON u.id = c.author_id WHERE c.id = ?1",
                    COMMENT_COLUMNS
                ),
                [id],
                comment_from_row,
            )
            .optional()?;
        Ok(comment)
    }

    /// Comments on a post, oldest first.
    pub fn get_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM comments c JOIN users u ON u.id = c.author_id
             WHERE c.post_id = ?1 ORDER BY c.seq",
            COMMENT_COLUMNS
        ))?;

        let comments = stmt
            .query_map([post_id], comment_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    pub fn delete_comment(&self, id: &str, author_id: &str) -> Result<bool> {
        let changed = self.conn()?.execute(
            "DELETE FROM comments WHERE id = ?1 AND author_id = ?2",
            params![id, author_id],
        )?;
        Ok(changed == 1)
    }

    // ----- scores and receipts -----

    /// Appends the submission and adds `delta` to the user's score in one
    /// transaction. Returns the new cumulative score.
    pub fn record_submission(&self, submission: &ReceiptSubmission, delta: u64) -> Result<u64> {
        let extracted = serde_json::to_string(&submission.extracted_fields)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO receipt_submissions
             (user_id, bill_type, bill_number, item_purchased, purchase_date, vendor,
              purchase_mode, eco_certification, total_amount, extracted_fields,
              score_delta, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                submission.user_id,
                submission.bill_type,
                submission.bill_number,
                submission.item_purchased,
                submission.purchase_date,
                submission.vendor,
                submission.purchase_mode,
                submission.eco_certification,
                submission.total_amount,
                extracted,
                delta,
                Utc::now(),
            ],
        )?;

        let total: u64 = tx.query_row(
            "UPDATE user_scores SET green_score = green_score + ?1
             WHERE user_id = ?2
             RETURNING green_score",
            params![delta, submission.user_id],
            |row| row.get(0),
        )?;

        tx.commit()?;
        Ok(total)
    }

    pub fn get_score(&self, user_id: &str) -> Result<Option<u64>> {
        let conn = self.conn()?;
        let score = conn
            .query_row(
                "SELECT green_score FROM user_scores WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(score)
    }

    /// Highest scores first, ties by user id ascending.
    pub fn get_top_scores(&self, limit: usize) -> Result<Vec<(User, u64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT u.id, u.name, u.created_at, s.green_score
             FROM user_scores s JOIN users u ON u.id = s.user_id
             ORDER BY s.green_score DESC, u.id ASC
             LIMIT ?1",
        )?;

        let rows = stmt
            .query_map([limit as i64], |row| Ok((user_from_row(row)?, row.get(3)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn get_submission_history(&self, user_id: &str) -> Result<Vec<SubmissionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, bill_type, bill_number, item_purchased, purchase_date, vendor,
                    purchase_mode, eco_certification, total_amount, extracted_fields,
                    score_delta, submitted_at
             FROM receipt_submissions
             WHERE user_id = ?1
             ORDER BY id",
        )?;

        let rows = stmt
            .query_map([user_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    ReceiptSubmission {
                        user_id: row.get(1)?,
                        bill_type: row.get(2)?,
                        bill_number: row.get(3)?,
                        item_purchased: row.get(4)?,
                        purchase_date: row.get(5)?,
                        vendor: row.get(6)?,
                        purchase_mode: row.get(7)?,
                        eco_certification: row.get(8)?,
                        total_amount: row.get(9)?,
                        extracted_fields: Default::default(),
                    },
                    row.get::<_, String>(10)?,
                    row.get::<_, u64>(11)?,
                    row.get::<_, DateTime<Utc>>(12)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, mut submission, extracted, score_delta, submitted_at)| {
                submission.extracted_fields = serde_json::from_str(&extracted)?;
                Ok(SubmissionRecord {
                    id,
                    submission,
                    score_delta,
                    submitted_at,
                })
            })
            .collect()
    }

    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let conn = self.conn()?;
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        let total_users = count("SELECT COUNT(*) FROM users")?;
        let available_donations = count("SELECT COUNT(*) FROM donations WHERE status = 'Available'")?;
        let claimed_donations = count("SELECT COUNT(*) FROM donations WHERE status = 'Claimed'")?;
        let removed_donations = count("SELECT COUNT(*) FROM donations WHERE status = 'Removed'")?;
        let total_submissions = count("SELECT COUNT(*) FROM receipt_submissions")?;
        let total_posts = count("SELECT COUNT(*) FROM posts")?;

        let total_green_score: Option<u64> = conn.query_row(
            "SELECT SUM(green_score) FROM user_scores",
            [],
            |row| row.get(0),
        )?;

        Ok(DatabaseStats {
            total_users,
            available_donations,
            claimed_donations,
            removed_donations,
            total_submissions,
            total_green_score: total_green_score.unwrap_or(0),
            total_posts,
        })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn donation_from_row(row: &Row<'_>) -> rusqlite::Result<Donation> {
    Ok(Donation {
        id: row.get(0)?,
        donor_id: row.get(1)?,
        full_name: row.get(2)?,
        contact_number: row.get(3)?,
        food_type: row.get(4)?,
        item_name: row.get(5)?,
        weight: row.get(6)?,
        cooking_date: row.get(7)?,
        expiry_date: row.get(8)?,
        storage_instructions: row.get(9)?,
        pickup_address: row.get(10)?,
        image_ref: row.get(11)?,
        status: row.get(12)?,
        claimant_id: row.get(13)?,
        created_at: row.get(14)?,
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_name: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        image_ref: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author_name: row.get(3)?,
        text: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn checked(donation: Donation) -> Result<Donation> {
    donation.check_invariants()?;
    Ok(donation)
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub total_users: usize,
    pub available_donations: usize,
    pub claimed_donations: usize,
    pub removed_donations: usize,
    pub total_submissions: usize,
    pub total_green_score: u64,
    pub total_posts: usize,
}
