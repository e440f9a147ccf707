//! End-to-end conversation flow against a real in-memory workspace:
//! orders/users schema, an inner join on id, mock-generated grouped-sum
//! SQL, chart classification, and the correction round-trip.

use std::collections::BTreeMap;

use clarodb::conversation::{
    classify_columns, execute_op, generate_sql_op, initialize_chat_session, AnalysisResult,
    Conversation, TurnState,
};
use clarodb::llm::mock::MockProvider;
use clarodb_db::{CellValue, Join, JoinType, WorkspaceDb};

const GROUPED_SUM_SQL: &str = "SELECT users.name, SUM(orders.amount) AS total \
     FROM orders INNER JOIN users ON orders.id = users.id \
     GROUP BY users.name ORDER BY users.name";

async fn orders_users_db() -> WorkspaceDb {
    let db = WorkspaceDb::open_in_memory().await.unwrap();
    db.ingest_csv("orders", "id,amount\n1,10\n2,25\n1,5\n")
        .await
        .unwrap();
    db.ingest_csv("users", "id,name\n1,Ada\n2,Grace\n")
        .await
        .unwrap();
    db
}

fn inner_join() -> Join {
    Join {
        id: "j1".to_string(),
        table1: "orders".to_string(),
        column1: "id".to_string(),
        table2: "users".to_string(),
        column2: "id".to_string(),
        join_type: JoinType::Inner,
    }
}

#[tokio::test]
async fn full_turn_produces_grouped_sums() {
    let db = orders_users_db().await;
    let joins = vec![inner_join()];
    let provider = MockProvider::new();
    provider.queue_sql(GROUPED_SUM_SQL);

    let mut conversation = Conversation::new();
    let turn_id = conversation
        .begin_ask("total amount per user name")
        .unwrap();

    // session seeding includes schema, previews, and the modeled join
    let chat = initialize_chat_session(&db, &joins).await.unwrap();
    let system = chat.system_prompt().to_string();
    assert!(system.contains("orders"));
    assert!(system.contains("users"));
    assert!(system.contains("INNER"));

    let (chat, outcome) =
        generate_sql_op(&provider, chat, "total amount per user name").await;
    conversation.set_chat_session(chat);
    assert!(conversation.apply_sql(turn_id, outcome));
    assert_eq!(
        conversation.turn(turn_id).unwrap().state,
        TurnState::SqlReady
    );

    let plan = conversation
        .begin_execute(turn_id, GROUPED_SUM_SQL)
        .unwrap();
    assert!(!plan.is_correction);
    let outcome = execute_op(&db, &plan, "total amount per user name").await;
    assert!(conversation.apply_execute(turn_id, outcome.result));

    let turn = conversation.turn(turn_id).unwrap();
    assert_eq!(turn.state, TurnState::Complete);
    let data = &turn.analysis.as_ref().unwrap().data;
    assert_eq!(data.columns, vec!["name", "total"]);

    let by_name: BTreeMap<String, f64> = data
        .rows
        .iter()
        .map(|row| {
            let name = row[0].display();
            let total = row[1].as_number().unwrap();
            (name, total)
        })
        .collect();
    assert_eq!(by_name["Ada"], 15.0);
    assert_eq!(by_name["Grace"], 25.0);

    // grouped result is chartable: name is categorical, total numeric
    let classes = classify_columns(data);
    assert_eq!(classes.numeric, vec!["total"]);
    assert_eq!(classes.categorical, vec!["name"]);
    assert!(conversation.generate_chart(turn_id).unwrap().is_none());
    let chart = conversation.chart_for(turn_id).unwrap();
    assert_eq!(chart.name_key, "name");
    assert_eq!(chart.data_keys, vec!["total"]);
}

#[tokio::test]
async fn edited_sql_records_correction_and_reseeds_session() {
    let db = orders_users_db().await;
    let provider = MockProvider::new();
    provider.queue_sql("SELECT * FROM orders");

    let mut conversation = Conversation::new();
    let turn_id = conversation.begin_ask("show big orders").unwrap();
    let chat = initialize_chat_session(&db, &[]).await.unwrap();
    let (chat, outcome) = generate_sql_op(&provider, chat, "show big orders").await;
    conversation.set_chat_session(chat);
    conversation.apply_sql(turn_id, outcome);

    // the user tightens the query before running it
    let edited = "SELECT * FROM orders WHERE amount > 20";
    let plan = conversation.begin_execute(turn_id, edited).unwrap();
    assert!(plan.is_correction);
    let outcome = execute_op(&db, &plan, "show big orders").await;
    assert!(outcome.recorded_correction);
    conversation.apply_execute(turn_id, outcome.result);
    conversation.invalidate_chat_session();
    assert!(conversation.chat_session().is_none());

    // correction round-trip: bounded, most recent included
    let corrections = db.corrections(5).await.unwrap();
    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].question, "show big orders");
    assert_eq!(corrections[0].sql, edited);

    // a reseeded session carries the correction forward
    let chat = initialize_chat_session(&db, &[]).await.unwrap();
    assert!(chat.system_prompt().contains(edited));
}

#[tokio::test]
async fn failed_execution_is_rewritten_and_contained() {
    let db = orders_users_db().await;
    let mut conversation = Conversation::new();

    let turn_id = conversation.begin_ask("query a ghost table").unwrap();
    let provider = MockProvider::new();
    provider.queue_sql("SELECT * FROM ghosts");
    let (_, outcome) =
        generate_sql_op(&provider, initialize_chat_session(&db, &[]).await.unwrap(), "q").await;
    conversation.apply_sql(turn_id, outcome);

    let plan = conversation
        .begin_execute(turn_id, "SELECT * FROM ghosts")
        .unwrap();
    let outcome = execute_op(&db, &plan, "query a ghost table").await;
    let err = outcome.result.unwrap_err();
    assert!(err.contains("ghosts"), "hint should name the table: {err}");
    conversation.apply_execute(turn_id, Err(err));

    let turn = conversation.turn(turn_id).unwrap();
    assert_eq!(turn.state, TurnState::Error);

    // the workspace stays usable: a fresh turn still works
    let next = conversation.begin_ask("count orders").unwrap();
    assert_eq!(
        conversation.turn(next).unwrap().state,
        TurnState::SqlGenerating
    );
}

#[tokio::test]
async fn stale_results_cannot_mutate_a_reset_conversation() {
    let db = orders_users_db().await;
    let mut conversation = Conversation::new();
    let turn_id = conversation.begin_ask("anything").unwrap();
    let plan_sql = "SELECT COUNT(*) AS n FROM orders";

    conversation.reset();

    // late results for the dropped turn are ignored
    let rows = db.execute(plan_sql).await.unwrap();
    assert!(!conversation.apply_execute(
        turn_id,
        Ok(AnalysisResult {
            sql: plan_sql.to_string(),
            data: rows,
        })
    ));
    assert!(conversation.turns().is_empty());
}

#[tokio::test]
async fn cell_values_keep_their_kinds_through_execution() {
    let db = orders_users_db().await;
    let rows = db
        .execute("SELECT name, id FROM users ORDER BY id")
        .await
        .unwrap();
    assert!(matches!(rows.rows[0][0], CellValue::Text(_)));
    assert!(matches!(rows.rows[0][1], CellValue::Number(_)));
}
