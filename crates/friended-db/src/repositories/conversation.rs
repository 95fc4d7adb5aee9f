//! PostgreSQL implementation of ConversationRepository
//!
//! Message delivery locks both participant rows in ascending id order (and, for game
//! messages, the game row first) with `SELECT ... FOR UPDATE`. Senders on either side of
//! a pair serialize, so the pair never gets two conversations and counters stay exact.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use friended_core::entities::{expiry_from, Conversation, PostReply, UserMessage};
use friended_core::traits::{
    ConversationRepository, DeliveredMessage, GameMessageWrite, OutgoingMessage, RepoResult,
};
use friended_core::value_objects::Snowflake;

use crate::mappers::{raw_id, raw_ids};
use crate::models::{ConversationModel, UserMessageModel};

use super::error::{conversation_not_found, game_not_found, map_db_error, user_not_found};

/// PostgreSQL implementation of ConversationRepository
#[derive(Clone)]
pub struct PgConversationRepository {
    pool: PgPool,
}

impl PgConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn lock_user(conn: &mut PgConnection, id: Snowflake) -> RepoResult<()> {
    sqlx::query_scalar::<_, i64>(
        r"
        SELECT id FROM users WHERE id = $1 FOR UPDATE
        ",
    )
    .bind(id.into_inner())
    .fetch_optional(conn)
    .await
    .map_err(map_db_error)?
    .ok_or_else(|| user_not_found(id))?;

    Ok(())
}

/// Lock both participants, lower id first
async fn lock_pair(conn: &mut PgConnection, a: Snowflake, b: Snowflake) -> RepoResult<()> {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    lock_user(&mut *conn, first).await?;
    if second != first {
        lock_user(&mut *conn, second).await?;
    }
    Ok(())
}

async fn find_pair_for_update(
    conn: &mut PgConnection,
    a: Snowflake,
    b: Snowflake,
) -> RepoResult<Option<ConversationModel>> {
    sqlx::query_as::<_, ConversationModel>(
        r"
        SELECT id, initiating_user_id, target_user_id, initiating_message_id,
               most_recent_message_id, is_active, expires_at, hidden_by_initiating_user,
               hidden_by_target_user, unread_count_initiating_user, unread_count_target_user,
               created_at, updated_at
        FROM conversations
        WHERE (initiating_user_id = $1 AND target_user_id = $2)
           OR (initiating_user_id = $2 AND target_user_id = $1)
        FOR UPDATE
        ",
    )
    .bind(a.into_inner())
    .bind(b.into_inner())
    .fetch_optional(conn)
    .await
    .map_err(map_db_error)
}

/// Find the pair's conversation or insert a new one, then point it at `message_id`,
/// unhide it for both sides and push its expiry out
async fn open_conversation(
    conn: &mut PgConnection,
    new_id: Snowflake,
    sender: Snowflake,
    recipient: Snowflake,
    message_id: Snowflake,
    activate: bool,
    now: DateTime<Utc>,
) -> RepoResult<i64> {
    let expires_at = expiry_from(now);

    if let Some(existing) = find_pair_for_update(&mut *conn, sender, recipient).await? {
        sqlx::query(
            r"
            UPDATE conversations
            SET most_recent_message_id = $2,
                expires_at = $3,
                is_active = is_active OR $4,
                hidden_by_initiating_user = FALSE,
                hidden_by_target_user = FALSE,
                updated_at = $5
            WHERE id = $1
            ",
        )
        .bind(existing.id)
        .bind(message_id.into_inner())
        .bind(expires_at)
        .bind(activate)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(map_db_error)?;

        return Ok(existing.id);
    }

    sqlx::query(
        r"
        INSERT INTO conversations (id, initiating_user_id, target_user_id, initiating_message_id,
                                   most_recent_message_id, is_active, expires_at,
                                   created_at, updated_at)
        VALUES ($1, $2, $3, $4, $4, $5, $6, $7, $7)
        ",
    )
    .bind(new_id.into_inner())
    .bind(sender.into_inner())
    .bind(recipient.into_inner())
    .bind(message_id.into_inner())
    .bind(activate)
    .bind(expires_at)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(map_db_error)?;

    debug!(conversation_id = %new_id, "Conversation opened");
    Ok(new_id.into_inner())
}

async fn refresh_unread_counts(conn: &mut PgConnection, conversation_id: i64) -> RepoResult<()> {
    sqlx::query(
        r"
        UPDATE conversations c
        SET unread_count_initiating_user = (
                SELECT COUNT(*)::INTEGER FROM user_messages m
                WHERE m.conversation_id = c.id
                  AND m.recipient_user_id = c.initiating_user_id
                  AND m.read_by_recipient = FALSE),
            unread_count_target_user = (
                SELECT COUNT(*)::INTEGER FROM user_messages m
                WHERE m.conversation_id = c.id
                  AND m.recipient_user_id = c.target_user_id
                  AND m.read_by_recipient = FALSE)
        WHERE c.id = $1
        ",
    )
    .bind(conversation_id)
    .execute(conn)
    .await
    .map_err(map_db_error)?;

    Ok(())
}

async fn refresh_active_counts(
    conn: &mut PgConnection,
    user_ids: &[Snowflake],
    now: DateTime<Utc>,
) -> RepoResult<()> {
    sqlx::query(
        r"
        UPDATE users u
        SET active_conversations_count = (
            SELECT COUNT(*)::INTEGER FROM conversations c
            WHERE ((c.initiating_user_id = u.id AND c.hidden_by_initiating_user = FALSE)
                OR (c.target_user_id = u.id AND c.hidden_by_target_user = FALSE))
              AND (c.is_active OR c.expires_at > $2)
        )
        WHERE u.id = ANY($1)
        ",
    )
    .bind(raw_ids(user_ids))
    .bind(now)
    .execute(conn)
    .await
    .map_err(map_db_error)?;

    Ok(())
}

async fn bump_received(conn: &mut PgConnection, user_id: Snowflake) -> RepoResult<()> {
    sqlx::query(
        r"
        UPDATE users SET messages_received_count = messages_received_count + 1 WHERE id = $1
        ",
    )
    .bind(user_id.into_inner())
    .execute(conn)
    .await
    .map_err(map_db_error)?;

    Ok(())
}

async fn fetch_conversation(conn: &mut PgConnection, id: i64) -> RepoResult<Conversation> {
    sqlx::query_as::<_, ConversationModel>(
        r"
        SELECT id, initiating_user_id, target_user_id, initiating_message_id,
               most_recent_message_id, is_active, expires_at, hidden_by_initiating_user,
               hidden_by_target_user, unread_count_initiating_user, unread_count_target_user,
               created_at, updated_at
        FROM conversations
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(map_db_error)?
    .map(Conversation::from)
    .ok_or_else(|| conversation_not_found(Snowflake::new(id)))
}

async fn insert_message(conn: &mut PgConnection, message: &UserMessage) -> RepoResult<()> {
    sqlx::query(
        r"
        INSERT INTO user_messages (id, user_id, recipient_user_id, conversation_id,
                                   initiating_post_id, guess_game_id, text, read_by_recipient,
                                   created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ",
    )
    .bind(message.id.into_inner())
    .bind(message.user_id.into_inner())
    .bind(message.recipient_user_id.into_inner())
    .bind(raw_id(message.conversation_id))
    .bind(raw_id(message.initiating_post_id))
    .bind(raw_id(message.guess_game_id))
    .bind(&message.text)
    .bind(message.read_by_recipient)
    .bind(message.created_at)
    .bind(message.updated_at)
    .execute(conn)
    .await
    .map_err(map_db_error)?;

    Ok(())
}

#[async_trait]
impl ConversationRepository for PgConversationRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Conversation>> {
        let result = sqlx::query_as::<_, ConversationModel>(
            r"
            SELECT id, initiating_user_id, target_user_id, initiating_message_id,
                   most_recent_message_id, is_active, expires_at, hidden_by_initiating_user,
                   hidden_by_target_user, unread_count_initiating_user, unread_count_target_user,
                   created_at, updated_at
            FROM conversations
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Conversation::from))
    }

    #[instrument(skip(self))]
    async fn find_between(&self, a: Snowflake, b: Snowflake) -> RepoResult<Option<Conversation>> {
        let result = sqlx::query_as::<_, ConversationModel>(
            r"
            SELECT id, initiating_user_id, target_user_id, initiating_message_id,
                   most_recent_message_id, is_active, expires_at, hidden_by_initiating_user,
                   hidden_by_target_user, unread_count_initiating_user, unread_count_target_user,
                   created_at, updated_at
            FROM conversations
            WHERE (initiating_user_id = $1 AND target_user_id = $2)
               OR (initiating_user_id = $2 AND target_user_id = $1)
            ",
        )
        .bind(a.into_inner())
        .bind(b.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Conversation::from))
    }

    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: Snowflake, now: DateTime<Utc>) -> RepoResult<Vec<Conversation>> {
        let rows = sqlx::query_as::<_, ConversationModel>(
            r"
            SELECT id, initiating_user_id, target_user_id, initiating_message_id,
                   most_recent_message_id, is_active, expires_at, hidden_by_initiating_user,
                   hidden_by_target_user, unread_count_initiating_user, unread_count_target_user,
                   created_at, updated_at
            FROM conversations
            WHERE ((initiating_user_id = $1 AND hidden_by_initiating_user = FALSE)
                OR (target_user_id = $1 AND hidden_by_target_user = FALSE))
              AND (is_active OR expires_at > $2)
            ORDER BY most_recent_message_id DESC NULLS LAST, updated_at DESC
            ",
        )
        .bind(user_id.into_inner())
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(Conversation::from).collect())
    }

    #[instrument(
        skip(self, outgoing),
        fields(sender = %outgoing.message.user_id, recipient = %outgoing.message.recipient_user_id)
    )]
    async fn send_message(&self, outgoing: &OutgoingMessage) -> RepoResult<DeliveredMessage> {
        let now = Utc::now();
        let sender = outgoing.message.user_id;
        let recipient = outgoing.message.recipient_user_id;

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        lock_pair(&mut tx, sender, recipient).await?;

        let conversation_id = open_conversation(
            &mut tx,
            outgoing.new_conversation_id,
            sender,
            recipient,
            outgoing.message.id,
            outgoing.activate,
            now,
        )
        .await?;

        let mut message = outgoing.message.clone();
        message.conversation_id = Some(Snowflake::new(conversation_id));
        insert_message(&mut tx, &message).await?;

        refresh_unread_counts(&mut tx, conversation_id).await?;
        bump_received(&mut tx, recipient).await?;
        refresh_active_counts(&mut tx, &[sender, recipient], now).await?;

        let conversation = fetch_conversation(&mut tx, conversation_id).await?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(DeliveredMessage {
            message,
            conversation,
            created: true,
        })
    }

    #[instrument(skip(self, write), fields(game_id = %write.game_id))]
    async fn write_game_message(&self, write: &GameMessageWrite) -> RepoResult<DeliveredMessage> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let existing_message_id = sqlx::query_scalar::<_, Option<i64>>(
            r"
            SELECT user_message_id FROM guess_games WHERE id = $1 FOR UPDATE
            ",
        )
        .bind(write.game_id.into_inner())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| game_not_found(write.game_id))?;

        lock_pair(&mut tx, write.by_user_id, write.about_user_id).await?;

        let existing = match existing_message_id {
            Some(id) => sqlx::query_as::<_, UserMessageModel>(
                r"
                SELECT id, user_id, recipient_user_id, conversation_id, initiating_post_id,
                       guess_game_id, text, read_by_recipient, created_at, updated_at
                FROM user_messages
                WHERE id = $1
                ",
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?
            .map(UserMessage::from),
            None => None,
        };

        let message_id = existing.as_ref().map_or(write.new_message_id, |m| m.id);
        let conversation_id = open_conversation(
            &mut tx,
            write.new_conversation_id,
            write.by_user_id,
            write.about_user_id,
            message_id,
            false,
            now,
        )
        .await?;

        let (message, created) = match existing {
            Some(mut message) => {
                sqlx::query(
                    r"
                    UPDATE user_messages
                    SET text = $2, conversation_id = $3, read_by_recipient = FALSE, updated_at = $4
                    WHERE id = $1
                    ",
                )
                .bind(message.id.into_inner())
                .bind(&write.text)
                .bind(conversation_id)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;

                message.text.clone_from(&write.text);
                message.conversation_id = Some(Snowflake::new(conversation_id));
                message.read_by_recipient = false;
                message.updated_at = now;
                (message, false)
            }
            None => {
                let mut message = UserMessage::new(
                    write.new_message_id,
                    write.by_user_id,
                    write.about_user_id,
                    write.text.clone(),
                );
                message.conversation_id = Some(Snowflake::new(conversation_id));
                message.guess_game_id = Some(write.game_id);
                insert_message(&mut tx, &message).await?;

                sqlx::query(
                    r"
                    UPDATE guess_games SET user_message_id = $2, updated_at = $3 WHERE id = $1
                    ",
                )
                .bind(write.game_id.into_inner())
                .bind(message.id.into_inner())
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;

                bump_received(&mut tx, write.about_user_id).await?;
                (message, true)
            }
        };

        refresh_unread_counts(&mut tx, conversation_id).await?;
        refresh_active_counts(&mut tx, &[write.by_user_id, write.about_user_id], now).await?;

        let conversation = fetch_conversation(&mut tx, conversation_id).await?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(DeliveredMessage {
            message,
            conversation,
            created,
        })
    }

    #[instrument(skip(self))]
    async fn messages(&self, conversation_id: Snowflake) -> RepoResult<Vec<UserMessage>> {
        let rows = sqlx::query_as::<_, UserMessageModel>(
            r"
            SELECT id, user_id, recipient_user_id, conversation_id, initiating_post_id,
                   guess_game_id, text, read_by_recipient, created_at, updated_at
            FROM user_messages
            WHERE conversation_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(conversation_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(UserMessage::from).collect())
    }

    #[instrument(skip(self))]
    async fn mark_read(&self, conversation_id: Snowflake, reader: Snowflake) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        sqlx::query(
            r"
            UPDATE user_messages
            SET read_by_recipient = TRUE, updated_at = NOW()
            WHERE conversation_id = $1 AND recipient_user_id = $2 AND read_by_recipient = FALSE
            ",
        )
        .bind(conversation_id.into_inner())
        .bind(reader.into_inner())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        refresh_unread_counts(&mut tx, conversation_id.into_inner()).await?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, conversation), fields(conversation_id = %conversation.id))]
    async fn update_visibility(&self, conversation: &Conversation) -> RepoResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let result = sqlx::query(
            r"
            UPDATE conversations
            SET hidden_by_initiating_user = $2, hidden_by_target_user = $3, updated_at = $4
            WHERE id = $1
            ",
        )
        .bind(conversation.id.into_inner())
        .bind(conversation.hidden_by_initiating_user)
        .bind(conversation.hidden_by_target_user)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(conversation_not_found(conversation.id));
        }

        refresh_active_counts(
            &mut tx,
            &[conversation.initiating_user_id, conversation.target_user_id],
            now,
        )
        .await?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn activate_between(&self, a: Snowflake, b: Snowflake) -> RepoResult<()> {
        sqlx::query(
            r"
            UPDATE conversations
            SET is_active = TRUE, updated_at = NOW()
            WHERE (initiating_user_id = $1 AND target_user_id = $2)
               OR (initiating_user_id = $2 AND target_user_id = $1)
            ",
        )
        .bind(a.into_inner())
        .bind(b.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, blocked_ids))]
    async fn replies_to_post(&self, post_id: Snowflake, blocked_ids: &[Snowflake]) -> RepoResult<Vec<PostReply>> {
        // First reply per conversation
        let replies = sqlx::query_as::<_, UserMessageModel>(
            r"
            SELECT DISTINCT ON (m.conversation_id)
                   m.id, m.user_id, m.recipient_user_id, m.conversation_id, m.initiating_post_id,
                   m.guess_game_id, m.text, m.read_by_recipient, m.created_at, m.updated_at
            FROM user_messages m
            JOIN users u ON u.id = m.user_id
            WHERE m.initiating_post_id = $1
              AND m.conversation_id IS NOT NULL
              AND (u.hidden_reason IS NULL OR u.hidden_reason = '')
              AND m.user_id <> ALL($2)
            ORDER BY m.conversation_id, m.created_at
            ",
        )
        .bind(post_id.into_inner())
        .bind(raw_ids(blocked_ids))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let conversation_ids: Vec<i64> = replies.iter().filter_map(|m| m.conversation_id).collect();
        if conversation_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conversations = sqlx::query_as::<_, ConversationModel>(
            r"
            SELECT id, initiating_user_id, target_user_id, initiating_message_id,
                   most_recent_message_id, is_active, expires_at, hidden_by_initiating_user,
                   hidden_by_target_user, unread_count_initiating_user, unread_count_target_user,
                   created_at, updated_at
            FROM conversations
            WHERE id = ANY($1)
            ORDER BY most_recent_message_id DESC NULLS LAST
            ",
        )
        .bind(conversation_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let mut by_conversation: HashMap<i64, UserMessage> = replies
            .into_iter()
            .filter_map(|m| m.conversation_id.map(|cid| (cid, UserMessage::from(m))))
            .collect();

        Ok(conversations
            .into_iter()
            .filter_map(|c| {
                by_conversation.remove(&c.id).map(|reply| PostReply {
                    conversation: Conversation::from(c),
                    reply,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgConversationRepository>();
    }
}
