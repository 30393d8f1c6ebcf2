//! Trip records as held by the trip list and itinerary screens.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::item::{IdField, ItemId, ListItem};

crate::typed_id!(TripId);
crate::typed_id!(UserId);
crate::typed_id!(ActivityId);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    pub title: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Activity {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: ActivityId(Uuid::new_v4().to_string()),
            title: title.into(),
            time: None,
            location: None,
            notes: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDay {
    pub day_number: u32,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl ItineraryDay {
    #[must_use]
    pub fn empty(day_number: u32) -> Self {
        Self {
            day_number,
            date: None,
            activities: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: TripId,
    pub owner_id: UserId,
    pub title: String,
    #[serde(default)]
    pub destination: Option<String>,
    /// ISO-8601 calendar dates.
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub days: Vec<ItineraryDay>,
    pub created_at_ms: u64,
}

impl Trip {
    /// A locally created trip with a fresh id, for optimistic inserts before
    /// the store has acknowledged it.
    pub fn draft(owner_id: UserId, title: impl Into<String>, created_at_ms: u64) -> Self {
        Self {
            id: TripId(Uuid::new_v4().to_string()),
            owner_id,
            title: title.into(),
            destination: None,
            start_date: None,
            end_date: None,
            notes: None,
            days: Vec::new(),
            created_at_ms,
        }
    }

    /// Returns the day numbered `day_number`, creating it when missing.
    /// Missing days below it are filled in too, each at its sorted position.
    pub fn day_mut(&mut self, day_number: u32) -> &mut ItineraryDay {
        let mut index = 0;
        for n in 1..=day_number.max(1) {
            index = match self.days.iter().position(|d| d.day_number == n) {
                Some(found) => found,
                None => {
                    let at = self
                        .days
                        .iter()
                        .position(|d| d.day_number > n)
                        .unwrap_or(self.days.len());
                    self.days.insert(at, ItineraryDay::empty(n));
                    at
                }
            };
        }
        &mut self.days[index]
    }

    pub fn add_activity(&mut self, day_number: u32, activity: Activity) {
        self.day_mut(day_number).activities.push(activity);
    }

    pub fn remove_activity(&mut self, id: &ActivityId) -> Option<Activity> {
        self.days.iter_mut().find_map(|day| {
            let index = day.activities.iter().position(|a| &a.id == id)?;
            Some(day.activities.remove(index))
        })
    }

    #[must_use]
    pub fn activity_count(&self) -> usize {
        self.days.iter().map(|d| d.activities.len()).sum()
    }
}

/// Partial update of a trip's inline-editable details.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPatch {
    pub title: Option<String>,
    pub destination: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub notes: Option<String>,
    pub days: Option<Vec<ItineraryDay>>,
}

impl TripPatch {
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl ListItem for Trip {
    type Patch = TripPatch;

    fn identity(&self, field: &IdField) -> Option<ItemId> {
        match field.as_str() {
            "id" => Some(ItemId(self.id.0.clone())),
            "ownerId" | "owner_id" => Some(ItemId(self.owner_id.0.clone())),
            _ => None,
        }
    }

    fn merge(&mut self, patch: TripPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(destination) = patch.destination {
            self.destination = Some(destination);
        }
        if let Some(start) = patch.start_date {
            self.start_date = Some(start);
        }
        if let Some(end) = patch.end_date {
            self.end_date = Some(end);
        }
        if let Some(notes) = patch.notes {
            self.notes = Some(notes);
        }
        if let Some(days) = patch.days {
            self.days = days;
        }
    }
}

/// Caller arguments for the trip list query.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripQuery {
    pub owner_id: UserId,
    #[serde(default)]
    pub search: Option<String>,
}

impl TripQuery {
    pub fn for_owner(owner_id: impl Into<UserId>) -> Self {
        Self {
            owner_id: owner_id.into(),
            search: None,
        }
    }

    #[must_use]
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        let trimmed = term.trim();
        self.search = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }
}
