use crate::models::Participant;

pub const WELCOME_TEXT: &str = "Welcome to the Contoso Dentistry Service. \
You can ask general questions about our services and conditions, \
query for available appointment time slots for a date \
and book a timeslot for that date.";

/// Members of a join event that should be greeted; the bot never greets itself.
pub fn welcome_recipients<'a>(
    bot_id: &'a str,
    members_added: &'a [Participant],
) -> impl Iterator<Item = &'a Participant> + 'a {
    members_added
        .iter()
        .filter(move |member| member.id != bot_id)
}
