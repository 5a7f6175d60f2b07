/*!
Storage, ballot ledger and tallies for small school elections.

The election data lives in a few JSON documents in a data directory (see
[`store`]). The [`Ledger`] casts votes and remembers which positions each
voter has voted for, [`results`] reads the tallies back through the current
roster, and [`Admin`] manages the roster and resets the election.

```
use ballot_box::{results, Admin, Ballot, Ledger, Roster, Store};
# fn main() -> Result<(), ballot_box::BallotError> {
# let dir = tempfile::tempdir().unwrap();
let store = Store::open(dir.path());
store.initialize(&Roster::new().with_position("Head Student", &["Anna", "Bob"]))?;

let ledger = Ledger::new(&store);
ledger.submit(&Ballot::new("STU001").choose("Head Student", "Anna"))?;
ledger.submit(&Ballot::new("STU001").choose("Head Student", "Bob"))?;

assert_eq!(results(&store).get("Head Student", "Anna"), Some(1));
assert_eq!(results(&store).get("Head Student", "Bob"), Some(0));

let admin = Admin::new(&store);
assert_eq!(admin.export().len(), 2);
# Ok(())
# }
```
*/

mod admin;
mod ledger;
pub mod manual;
mod model;
pub mod store;
mod tally;

pub use crate::admin::*;
pub use crate::ledger::*;
pub use crate::model::*;
pub use crate::store::{Document, DocumentKind, Store};
pub use crate::tally::*;
