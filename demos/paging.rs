/// Walks a generated table page by page through a saved view.
///
/// Run with `RUST_LOG=debug` to see the compiled plan for every page.

use livegrid::*;

fn main() -> livegrid::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let engine = QueryEngine::new(MemoryStore::new());
    engine.create_table("pets")?;
    engine.add_column("pets", NewColumn::number("pets-age", "Age"))?;
    engine.bulk_create_rows(&BulkCreateRequest {
        table_id: "pets".to_string(),
        ids: (1..=40).map(|i| format!("pet-{}", i)).collect(),
        seed: 7,
    })?;

    let mut filters = FilterList::new();
    filters.push(FilterSpec::new("f1", "Age", ColumnType::Number, FilterOperator::Gt, "30"));
    filters.push(
        FilterSpec::from_label("f2", "Status", ColumnType::Text, "is empty", None)
            .ok_or_else(|| EngineError::InvalidValue("unknown operator".to_string()))?
            .with_combinator(Combinator::Or),
    );

    let views = ViewStore::new();
    let mut view = View::new("older", "pets", "Older pets");
    view.filter_state = filters.into_vec();
    view.sorter_state = vec![SortSpec::descending("s1", "Age", ColumnType::Number)];
    let view = views.create(view)?;

    let mut cursor = None;
    let mut page = 1;
    loop {
        let response = engine.query_view(&view, cursor, Some(8))?;
        println!("page {} ({} of {} rows in table)", page, response.rows.len(), response.total_count);
        for row in &response.rows {
            println!(
                "  {:<8} age={:<4} name={}",
                row.id,
                row.number("Age").map_or("-".to_string(), |a| a.to_string()),
                row.text("Name").unwrap_or("")
            );
        }
        match response.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
        page += 1;
    }
    Ok(())
}

