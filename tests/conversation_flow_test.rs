//! End-to-end conversation flows through the router, with a recording
//! messenger in place of the Bot API.

mod common;

use common::{OWNER, test_bot};
use majordomo::host::HostJob;
use pretty_assertions::assert_eq;

const CHAT: i64 = 1;

// ==================== Config conversation ====================

#[tokio::test]
async fn test_config_set_round_trip() {
    let bot = test_bot();

    bot.say(CHAT, OWNER, "/config").await;
    assert_eq!(bot.state(CHAT).unwrap().state, "start");

    bot.say(CHAT, OWNER, "set").await;
    assert_eq!(bot.state(CHAT).unwrap().state, "await_set_key");

    bot.say(CHAT, OWNER, "a.b").await;
    assert_eq!(bot.state(CHAT).unwrap().state, "await_set_value");

    bot.say(CHAT, OWNER, "v").await;
    assert_eq!(bot.kv.get("a.b").unwrap(), "v");

    // Conversation ended: state and scratch destroyed, prompt deleted,
    // plain confirmation sent.
    assert!(bot.state(CHAT).is_none());
    assert_eq!(bot.messenger.deleted_count(), 1);
    assert_eq!(bot.messenger.last_sent().unwrap(), "a.b is now set.");
}

#[tokio::test]
async fn test_invalid_key_reprompts_without_advancing() {
    let bot = test_bot();
    bot.say(CHAT, OWNER, "/config").await;
    bot.say(CHAT, OWNER, "set").await;
    let before = bot.state(CHAT).unwrap();

    bot.say(CHAT, OWNER, "Not A Key").await;

    let after = bot.state(CHAT).unwrap();
    assert_eq!(after.state, "await_set_key");
    assert_eq!(after.scratch, before.scratch);
    // The prompt was edited in place, not re-sent
    assert!(bot.messenger.last_edit().unwrap().contains("doesn't look like a config key"));
    assert_eq!(bot.messenger.deleted_count(), 0);
}

#[tokio::test]
async fn test_config_get_reads_back_a_value() {
    let bot = test_bot();
    bot.kv.set("net.proxy", "socks5://x").unwrap();

    bot.say(CHAT, OWNER, "/config").await;
    bot.say(CHAT, OWNER, "get").await;
    bot.say(CHAT, OWNER, "net.proxy").await;

    assert_eq!(
        bot.messenger.last_sent().unwrap(),
        "net.proxy = socks5://x"
    );
    assert!(bot.state(CHAT).is_none());
}

#[tokio::test]
async fn test_config_get_absent_key_ends_politely() {
    let bot = test_bot();
    bot.say(CHAT, OWNER, "/config").await;
    bot.say(CHAT, OWNER, "get").await;
    bot.say(CHAT, OWNER, "a.b").await;

    assert_eq!(
        bot.messenger.last_sent().unwrap(),
        "I don't know anything about that key."
    );
    assert!(bot.state(CHAT).is_none());
}

#[tokio::test]
async fn test_config_del_removes_a_key() {
    let bot = test_bot();
    bot.kv.set("a.b", "v").unwrap();

    bot.say(CHAT, OWNER, "/config").await;
    bot.say(CHAT, OWNER, "del").await;
    bot.say(CHAT, OWNER, "a.b").await;

    assert!(bot.kv.get("a.b").is_err());
    assert_eq!(bot.messenger.last_sent().unwrap(), "a.b is gone.");
}

#[tokio::test]
async fn test_cancel_clears_the_conversation() {
    let bot = test_bot();
    bot.say(CHAT, OWNER, "/config").await;
    bot.say(CHAT, OWNER, "set").await;
    bot.say(CHAT, OWNER, "cancel").await;

    assert!(bot.state(CHAT).is_none());
    assert_eq!(bot.messenger.last_sent().unwrap(), "Okay, cancelled.");
}

#[tokio::test]
async fn test_unexpected_input_closes_the_dialog() {
    let bot = test_bot();
    bot.say(CHAT, OWNER, "/config").await;
    // "blah" matches none of get/set/del in the start state
    bot.say(CHAT, OWNER, "blah").await;

    assert!(bot.state(CHAT).is_none());
    assert!(bot.messenger.last_sent().unwrap().contains("closed the dialog"));
}

#[tokio::test]
async fn test_active_conversation_consumes_other_commands() {
    let bot = test_bot();
    bot.say(CHAT, OWNER, "/config").await;
    bot.say(CHAT, OWNER, "set").await;
    // A stray top-level command mid-dialog lands in the free-text wildcard
    // of the awaiting state; it is key input (and an invalid key), not a
    // route to another conversation.
    bot.say(CHAT, OWNER, "/friends").await;

    let state = bot.state(CHAT).unwrap();
    assert_eq!(state.conversation, "config");
    assert_eq!(state.state, "await_set_key");
    assert!(bot.messenger.last_edit().unwrap().contains("doesn't look like a config key"));
}

// ==================== Friends conversation ====================

#[tokio::test]
async fn test_friends_add_by_numeric_id() {
    let bot = test_bot();
    bot.say(CHAT, OWNER, "/friends").await;
    bot.say(CHAT, OWNER, "add").await;
    bot.say(CHAT, OWNER, "21").await;

    assert_eq!(bot.friends.list().unwrap(), vec![21]);
    assert!(bot.state(CHAT).is_none());
    assert_eq!(
        bot.messenger.last_sent().unwrap(),
        "Added 21 to the friends list."
    );
}

#[tokio::test]
async fn test_friends_add_by_contact_card() {
    let bot = test_bot();
    bot.say(CHAT, OWNER, "/friends").await;
    bot.say(CHAT, OWNER, "add").await;
    bot.share_contact(CHAT, OWNER, 22).await;

    assert_eq!(bot.friends.list().unwrap(), vec![22]);
}

#[tokio::test]
async fn test_friends_add_owner_is_refused() {
    let bot = test_bot();
    bot.say(CHAT, OWNER, "/friends").await;
    bot.say(CHAT, OWNER, "add").await;
    bot.say(CHAT, OWNER, &OWNER.to_string()).await;

    // Nothing was persisted: the list is still uninitialized
    assert_eq!(bot.friends.stored().unwrap(), None);
    assert!(bot.messenger.last_sent().unwrap().contains("owner"));
}

#[tokio::test]
async fn test_friends_add_garbage_reprompts() {
    let bot = test_bot();
    bot.say(CHAT, OWNER, "/friends").await;
    bot.say(CHAT, OWNER, "add").await;
    bot.say(CHAT, OWNER, "-5").await;

    assert_eq!(bot.state(CHAT).unwrap().state, "await_add");
    assert!(bot.messenger.last_edit().unwrap().contains("positive numeric id"));
}

#[tokio::test]
async fn test_friends_listing_paginates_and_removes_by_position() {
    let bot = test_bot();
    for id in 21..=27 {
        bot.friends.add(id).unwrap();
    }

    bot.say(CHAT, OWNER, "/friends").await;
    bot.say(CHAT, OWNER, "list").await;
    let page_one = bot.messenger.last_edit().unwrap();
    assert!(page_one.contains("page 1/2"));
    assert!(page_one.contains("1. 21"));
    assert!(page_one.contains("5. 25"));
    assert!(page_one.contains("next"));

    bot.say(CHAT, OWNER, "next").await;
    let page_two = bot.messenger.last_edit().unwrap();
    assert!(page_two.contains("page 2/2"));
    assert!(page_two.contains("1. 26"));
    assert!(page_two.contains("2. 27"));
    // Fewer than a page remains: restart is offered instead of next
    assert!(page_two.contains("restart"));

    // Positional selection resolves against the page on screen
    bot.say(CHAT, OWNER, "2").await;
    assert!(bot.messenger.last_edit().unwrap().contains("Remove 27"));

    bot.say(CHAT, OWNER, "yes").await;
    assert_eq!(bot.friends.list().unwrap(), vec![21, 22, 23, 24, 25, 26]);
    assert!(bot.state(CHAT).is_none());
}

#[tokio::test]
async fn test_friends_listing_restart_returns_to_first_page() {
    let bot = test_bot();
    for id in 21..=27 {
        bot.friends.add(id).unwrap();
    }
    bot.say(CHAT, OWNER, "/friends").await;
    bot.say(CHAT, OWNER, "list").await;
    bot.say(CHAT, OWNER, "next").await;
    bot.say(CHAT, OWNER, "restart").await;
    assert!(bot.messenger.last_edit().unwrap().contains("page 1/2"));
}

#[tokio::test]
async fn test_friends_delete_with_confirmation() {
    let bot = test_bot();
    bot.friends.add(21).unwrap();
    bot.friends.add(22).unwrap();

    bot.say(CHAT, OWNER, "/friends").await;
    bot.say(CHAT, OWNER, "del").await;
    bot.say(CHAT, OWNER, "21").await;
    assert_eq!(bot.state(CHAT).unwrap().state, "confirm_del");

    bot.say(CHAT, OWNER, "yes").await;
    assert_eq!(bot.friends.list().unwrap(), vec![22]);
}

#[tokio::test]
async fn test_friends_delete_aborts_without_yes() {
    let bot = test_bot();
    bot.friends.add(21).unwrap();

    bot.say(CHAT, OWNER, "/friends").await;
    bot.say(CHAT, OWNER, "del").await;
    bot.say(CHAT, OWNER, "21").await;
    bot.say(CHAT, OWNER, "no").await;

    assert_eq!(bot.friends.list().unwrap(), vec![21]);
    assert!(bot.messenger.last_sent().unwrap().contains("leaving the friends list alone"));
}

#[tokio::test]
async fn test_friends_empty_listing_ends() {
    let bot = test_bot();
    bot.say(CHAT, OWNER, "/friends").await;
    bot.say(CHAT, OWNER, "list").await;

    assert!(bot.state(CHAT).is_none());
    assert!(bot.messenger.last_sent().unwrap().contains("empty"));
}

// ==================== Host component ====================

#[tokio::test]
async fn test_host_records_job_and_submits_task() {
    let bot = test_bot();

    bot.say(CHAT, OWNER, "/host start").await;

    let jobs = bot.relations.all::<HostJob>().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].action, "start");
    assert_eq!(jobs[0].status, "queued");
    assert_eq!(jobs[0].chat_id, CHAT);

    let submitted = bot.queue.submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].name, "host.start");
    assert_eq!(submitted[0].payload["action"], "start");

    assert!(bot.messenger.last_sent().unwrap().contains("Queued start"));
}

#[tokio::test]
async fn test_host_without_action_prints_usage() {
    let bot = test_bot();
    bot.say(CHAT, OWNER, "/host").await;

    assert!(bot.messenger.last_sent().unwrap().starts_with("Usage:"));
    assert!(bot.relations.all::<HostJob>().unwrap().is_empty());
    assert!(bot.queue.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_host_unknown_action_prints_usage() {
    let bot = test_bot();
    bot.say(CHAT, OWNER, "/host dance").await;

    assert!(bot.messenger.last_sent().unwrap().starts_with("Usage:"));
    assert!(bot.relations.all::<HostJob>().unwrap().is_empty());
}
