//! Enumerated code strings used in Primavera exports.

/// Relationship types between activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelationType {
    #[default]
    FinishStart,
    StartStart,
    FinishFinish,
    StartFinish,
}

impl RelationType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "PR_FS" => Some(Self::FinishStart),
            "PR_SS" => Some(Self::StartStart),
            "PR_FF" => Some(Self::FinishFinish),
            "PR_SF" => Some(Self::StartFinish),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::FinishStart => "PR_FS",
            Self::StartStart => "PR_SS",
            Self::FinishFinish => "PR_FF",
            Self::StartFinish => "PR_SF",
        }
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            Self::FinishStart => "FS",
            Self::StartStart => "SS",
            Self::FinishFinish => "FF",
            Self::StartFinish => "SF",
        }
    }
}

/// Activity type (`task_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivityType {
    #[default]
    TaskDependent,
    ResourceDependent,
    LevelOfEffort,
    StartMilestone,
    FinishMilestone,
    WbsSummary,
}

impl ActivityType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "TT_Task" => Some(Self::TaskDependent),
            "TT_Rsrc" => Some(Self::ResourceDependent),
            "TT_LOE" => Some(Self::LevelOfEffort),
            "TT_Mile" => Some(Self::StartMilestone),
            "TT_FinMile" => Some(Self::FinishMilestone),
            "TT_WBS" => Some(Self::WbsSummary),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::TaskDependent => "TT_Task",
            Self::ResourceDependent => "TT_Rsrc",
            Self::LevelOfEffort => "TT_LOE",
            Self::StartMilestone => "TT_Mile",
            Self::FinishMilestone => "TT_FinMile",
            Self::WbsSummary => "TT_WBS",
        }
    }

    pub fn is_milestone(self) -> bool {
        matches!(self, Self::StartMilestone | Self::FinishMilestone)
    }
}

/// Activity status (`status_code`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivityStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl ActivityStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "TK_NotStart" => Some(Self::NotStarted),
            "TK_Active" => Some(Self::InProgress),
            "TK_Complete" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::NotStarted => "TK_NotStart",
            Self::InProgress => "TK_Active",
            Self::Completed => "TK_Complete",
        }
    }
}

/// Which percent complete an activity reports (`complete_pct_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PercentCompleteType {
    #[default]
    Duration,
    Units,
    Physical,
}

impl PercentCompleteType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "CP_Drtn" => Some(Self::Duration),
            "CP_Units" => Some(Self::Units),
            "CP_Phys" => Some(Self::Physical),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Duration => "CP_Drtn",
            Self::Units => "CP_Units",
            Self::Physical => "CP_Phys",
        }
    }
}

/// Project-level definition of a critical activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CriticalActivityType {
    #[default]
    TotalFloat,
    LongestPath,
}

impl CriticalActivityType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "CT_TotFloat" => Some(Self::TotalFloat),
            "CT_DrivPath" => Some(Self::LongestPath),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::TotalFloat => "CT_TotFloat",
            Self::LongestPath => "CT_DrivPath",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarType {
    #[default]
    Global,
    Project,
    Resource,
}

impl CalendarType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "CA_Base" => Some(Self::Global),
            "CA_Project" => Some(Self::Project),
            "CA_Rsrc" => Some(Self::Resource),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Global => "CA_Base",
            Self::Project => "CA_Project",
            Self::Resource => "CA_Rsrc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceType {
    #[default]
    Labor,
    Nonlabor,
    Material,
}

impl ResourceType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "RT_Labor" => Some(Self::Labor),
            "RT_Equip" => Some(Self::Nonlabor),
            "RT_Mat" => Some(Self::Material),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Labor => "RT_Labor",
            Self::Nonlabor => "RT_Equip",
            Self::Material => "RT_Mat",
        }
    }
}

/// Date constraints (`cstr_type`, `cstr_type2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    StartOn,
    StartOnOrBefore,
    StartOnOrAfter,
    FinishOn,
    FinishOnOrBefore,
    FinishOnOrAfter,
    AsLateAsPossible,
    MandatoryStart,
    MandatoryFinish,
}

impl ConstraintType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "CS_MSO" => Some(Self::StartOn),
            "CS_MSOB" => Some(Self::StartOnOrBefore),
            "CS_MSOA" => Some(Self::StartOnOrAfter),
            "CS_MEO" => Some(Self::FinishOn),
            "CS_MEOB" => Some(Self::FinishOnOrBefore),
            "CS_MEOA" => Some(Self::FinishOnOrAfter),
            "CS_ALAP" => Some(Self::AsLateAsPossible),
            "CS_MANDSTART" => Some(Self::MandatoryStart),
            "CS_MANDFIN" => Some(Self::MandatoryFinish),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::StartOn => "CS_MSO",
            Self::StartOnOrBefore => "CS_MSOB",
            Self::StartOnOrAfter => "CS_MSOA",
            Self::FinishOn => "CS_MEO",
            Self::FinishOnOrBefore => "CS_MEOB",
            Self::FinishOnOrAfter => "CS_MEOA",
            Self::AsLateAsPossible => "CS_ALAP",
            Self::MandatoryStart => "CS_MANDSTART",
            Self::MandatoryFinish => "CS_MANDFIN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Top,
    High,
    #[default]
    Normal,
    Low,
    Lowest,
}

impl Priority {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "PT_Top" => Some(Self::Top),
            "PT_High" => Some(Self::High),
            "PT_Normal" => Some(Self::Normal),
            "PT_Low" => Some(Self::Low),
            "PT_Lowest" => Some(Self::Lowest),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Top => "PT_Top",
            Self::High => "PT_High",
            Self::Normal => "PT_Normal",
            Self::Low => "PT_Low",
            Self::Lowest => "PT_Lowest",
        }
    }
}

/// Activity duration type (`duration_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationType {
    FixedDuration,
    FixedUnits,
    FixedDurationAndUnits,
    FixedRate,
}

impl DurationType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "DT_FixedDrtn" => Some(Self::FixedDuration),
            "DT_FixedQty" => Some(Self::FixedUnits),
            "DT_FixedDUR2" => Some(Self::FixedDurationAndUnits),
            "DT_FixedRate" => Some(Self::FixedRate),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::FixedDuration => "DT_FixedDrtn",
            Self::FixedUnits => "DT_FixedQty",
            Self::FixedDurationAndUnits => "DT_FixedDUR2",
            Self::FixedRate => "DT_FixedRate",
        }
    }
}

/// Where the currency symbol sits relative to the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurrencySymbolPosition {
    #[default]
    Before,
    After,
    BeforeWithSpace,
    AfterWithSpace,
}

impl CurrencySymbolPosition {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "#1.1" => Some(Self::Before),
            "1.1#" => Some(Self::After),
            "# 1.1" => Some(Self::BeforeWithSpace),
            "1.1 #" => Some(Self::AfterWithSpace),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Before => "#1.1",
            Self::After => "1.1#",
            Self::BeforeWithSpace => "# 1.1",
            Self::AfterWithSpace => "1.1 #",
        }
    }
}
