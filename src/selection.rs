use std::sync::Arc;

use tokio::time::{timeout, Duration};
use tracing::debug;
use twilight_http::request::channel::reaction::RequestReactionType;
use twilight_model::{
    channel::{message::EmojiReactionType, Message},
    gateway::payload::incoming::ReactionAdd,
};

use crate::{
    controller::ControlError,
    helper,
    queue::QueueEntry,
    response_context::ResponseContext,
    source::TrackCandidate,
    state::State,
};

const UP: &str = "⬆️";
const DOWN: &str = "⬇️";
const CONFIRM: &str = "✅";

/// How long a picker waits for the next reaction. Every reaction starts
/// the window over.
const SELECTION_WAIT: Duration = Duration::from_secs(60);

enum Choice {
    Up,
    Down,
    Confirm,
}

/// Run a `search` command end to end: post the candidate menu, drive the
/// cursor from the requester's reactions and queue the confirmed pick.
pub async fn run(state: Arc<State>, msg: Message, query: String) -> Result<(), anyhow::Error> {
    debug!(
        message = "handling command",
        command = "search",
        channel = %msg.channel_id,
        author = %msg.author.name,
    );
    let response = ResponseContext::new(Arc::clone(&state), &msg);
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    state.controller.associate_text_channel(guild_id, msg.channel_id);

    if query.is_empty() {
        response
            .with_content(format!("Usage: {}search <query>", state.command_prefix))
            .await?;
        return Ok(());
    }

    let candidates = match state.source.search(&query).await {
        Ok(candidates) => candidates,
        Err(source) => {
            response
                .with_content(format!("An error occurred: {source}"))
                .await?;
            return Ok(());
        }
    };

    let mut selected = 0;
    let menu = response
        .with_content(render_menu(&query, &candidates, selected))
        .await?;
    for emoji in [UP, DOWN, CONFIRM] {
        state
            .http
            .create_reaction(
                menu.channel_id,
                menu.id,
                &RequestReactionType::Unicode { name: emoji },
            )
            .await?;
    }

    let author_id = msg.author.id;
    loop {
        let wait = state.standby.wait_for_reaction(menu.id, move |reaction: &ReactionAdd| {
            reaction.user_id == author_id && choice(&reaction.emoji).is_some()
        });
        let reaction = match timeout(SELECTION_WAIT, wait).await {
            Ok(Ok(reaction)) => reaction,
            // The window elapsed, or standby shut down with the process.
            Ok(Err(_)) | Err(_) => {
                let text = ControlError::SelectionTimeout.to_string();
                state
                    .http
                    .update_message(menu.channel_id, menu.id)
                    .content(Some(&text))
                    .await?;
                state
                    .http
                    .delete_all_reactions(menu.channel_id, menu.id)
                    .await?;
                return Ok(());
            }
        };

        match choice(&reaction.emoji) {
            Some(Choice::Up) => selected = cursor_up(selected, candidates.len()),
            Some(Choice::Down) => selected = cursor_down(selected, candidates.len()),
            Some(Choice::Confirm) => {
                let candidate = candidates[selected].clone();
                confirm(&state, &response, &msg, candidate).await?;
                state
                    .http
                    .delete_all_reactions(menu.channel_id, menu.id)
                    .await?;
                let text = format!("Selected: **{}**", candidates[selected].title);
                state
                    .http
                    .update_message(menu.channel_id, menu.id)
                    .content(Some(&text))
                    .await?;
                return Ok(());
            }
            // The standby check filters everything else out.
            None => continue,
        }

        let text = render_menu(&query, &candidates, selected);
        state
            .http
            .update_message(menu.channel_id, menu.id)
            .content(Some(&text))
            .await?;
        // Removing the cursor reaction needs manage messages; keep going
        // without it.
        if let EmojiReactionType::Unicode { name } = &reaction.emoji {
            let _ = state
                .http
                .delete_reaction(
                    menu.channel_id,
                    menu.id,
                    &RequestReactionType::Unicode { name },
                    reaction.user_id,
                )
                .await;
        }
    }
}

/// Queue the pick, then connect and start playback the way `play` does.
async fn confirm(
    state: &Arc<State>,
    response: &ResponseContext,
    msg: &Message,
    candidate: TrackCandidate,
) -> Result<(), anyhow::Error> {
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    state
        .controller
        .push(guild_id, QueueEntry::new(candidate.title.clone(), candidate.canonical_url));
    response
        .with_content(format!("Added to queue: **{}**", candidate.title))
        .await?;

    if !state.controller.is_connected(guild_id) {
        let Some(voice_channel) = helper::user_voice_channel(state, guild_id, msg.author.id)
        else {
            response
                .with_content(ControlError::NoVoiceChannel.to_string())
                .await?;
            return Ok(());
        };
        if let Err(err) = state
            .controller
            .ensure_connected(guild_id, voice_channel)
            .await
        {
            response.with_content(err.to_string()).await?;
            return Ok(());
        }
    }

    if let Err(err) = state.controller.ensure_playing(guild_id).await {
        response.with_content(err.to_string()).await?;
    }
    Ok(())
}

fn choice(emoji: &EmojiReactionType) -> Option<Choice> {
    match emoji {
        EmojiReactionType::Unicode { name } if name == UP => Some(Choice::Up),
        EmojiReactionType::Unicode { name } if name == DOWN => Some(Choice::Down),
        EmojiReactionType::Unicode { name } if name == CONFIRM => Some(Choice::Confirm),
        _ => None,
    }
}

fn cursor_up(selected: usize, count: usize) -> usize {
    (selected + count - 1) % count
}

fn cursor_down(selected: usize, count: usize) -> usize {
    (selected + 1) % count
}

fn render_menu(query: &str, candidates: &[TrackCandidate], selected: usize) -> String {
    let mut text = format!("Search results for \"{query}\":\n");
    for (index, candidate) in candidates.iter().enumerate() {
        let cursor = if index == selected { "▶️ " } else { "" };
        text.push_str(&format!(
            "{cursor}{}. {} (<{}>)\n",
            index + 1,
            candidate.title,
            candidate.canonical_url,
        ));
    }
    text.push_str("React with ⬆️ or ⬇️ to move and ✅ to queue the selected song.");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(count: usize) -> Vec<TrackCandidate> {
        (0..count)
            .map(|index| TrackCandidate {
                title: format!("candidate {index}"),
                canonical_url: format!("https://example.com/{index}"),
            })
            .collect()
    }

    #[test]
    fn cursor_wraps_at_both_ends() {
        assert_eq!(cursor_up(0, 5), 4);
        assert_eq!(cursor_up(3, 5), 2);
        assert_eq!(cursor_down(4, 5), 0);
        assert_eq!(cursor_down(1, 5), 2);
    }

    #[test]
    fn cursor_is_stable_with_a_single_candidate() {
        assert_eq!(cursor_up(0, 1), 0);
        assert_eq!(cursor_down(0, 1), 0);
    }

    #[test]
    fn menu_marks_only_the_selected_row() {
        let rendered = render_menu("test", &candidates(3), 1);

        assert!(rendered.contains("▶️ 2. candidate 1"));
        assert!(!rendered.contains("▶️ 1."));
        assert!(!rendered.contains("▶️ 3."));
        // Every candidate is listed, numbered from one.
        assert!(rendered.contains("1. candidate 0"));
        assert!(rendered.contains("3. candidate 2"));
    }

    #[test]
    fn reactions_map_to_cursor_moves() {
        let up = EmojiReactionType::Unicode {
            name: UP.to_owned(),
        };
        let custom = EmojiReactionType::Custom {
            animated: false,
            id: twilight_model::id::Id::new(123),
            name: Some("partyparrot".to_owned()),
        };

        assert!(matches!(choice(&up), Some(Choice::Up)));
        assert!(choice(&custom).is_none());
    }
}
