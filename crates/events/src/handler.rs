/// Execute an aggregate command in place (decide, then apply).
///
/// Returns the decided events. On error nothing is applied, so the aggregate
/// is left exactly as it was. Persistence and publication are the dispatcher's
/// job; this is for inline processing and tests.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: marketplace_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
